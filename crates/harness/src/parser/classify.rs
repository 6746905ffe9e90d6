//! Log line classification: raw text → [`LogLine`].
//!
//! The device log mixes several line shapes depending on how the logger was
//! invoked. Classification tries a fixed, ordered set of shape patterns and
//! returns the first match with its named fields extracted. A line matching
//! no shape is routine noise, not an error, and yields `None`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::model::LogLine;

// Order matters! More specific shapes first; `brief` is the common case.
static SHAPES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // brief: I/Tag(  123): message
        r"^(?P<level>[VDIWEAF])/(?P<tag>[^)]{0,23}?)\(\s*(?P<pid>\d+)\):\s(?P<message>.*)$",
        // threadtime: 01-02 03:04:05.678  123  456 I Tag: message
        r"^(?P<timestamp>\d\d-\d\d\s\d\d:\d\d:\d\d\.\d+)\s*(?P<pid>\d+)\s*(?P<tid>\d+)\s(?P<level>[VDIWEAF])\s(?P<tag>.*?):\s(?P<message>.*)$",
        // time: 01-02 03:04:05.678 I/Tag(  123): message
        r"^(?P<timestamp>\d\d-\d\d\s\d\d:\d\d:\d\d\.\d+):*\s(?P<level>[VDIWEAF])/(?P<tag>.*?)\(\s*(?P<pid>\d+)\):\s(?P<message>.*)$",
        // process: I(  123) message
        r"^(?P<level>[VDIWEAF])\(\s*(?P<pid>\d+)\)\s(?P<message>.*)$",
        // tag: I/Tag: message
        r"^(?P<level>[VDIWEAF])/(?P<tag>[^)]{0,23}?):\s(?P<message>.*)$",
        // thread: I(  123:0x1a2) message
        r"^(?P<level>[VDIWEAF])\(\s*(?P<pid>\d+):(?P<tid>0x.*?)\)\s(?P<message>.*)$",
        // ddms save: 01-02 03:04:05.678: INFO/Tag(123): message
        r"^(?P<timestamp>\d\d-\d\d\s\d\d:\d\d:\d\d\.\d+):*\s(?P<level>VERBOSE|DEBUG|ERROR|WARN|INFO|ASSERT)/(?P<tag>.*?)\(\s*(?P<pid>\d+)\):\s(?P<message>.*)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("log shape pattern must compile"))
    .collect()
});

/// Classify a raw log line into a structured [`LogLine`].
///
/// Trailing whitespace is trimmed first; an empty or unrecognized line
/// returns `None` and is silently dropped.
pub fn classify(raw: &str) -> Option<LogLine> {
    let line = raw.trim_end();

    if line.is_empty() {
        return None;
    }

    for shape in SHAPES.iter() {
        if let Some(caps) = shape.captures(line) {
            let field = |name: &str| caps.name(name).map(|m| m.as_str().to_string());

            return Some(LogLine {
                level: field("level"),
                timestamp: field("timestamp"),
                pid: caps
                    .name("pid")
                    .and_then(|m| m.as_str().trim().parse().ok()),
                tid: field("tid"),
                tag: field("tag"),
                message: field("message").unwrap_or_default(),
            });
        }
    }

    None
}

use crate::parser::model::{DecodeError, Entry, EntryKind, FilesizeEntry, LogLine};
use crate::parser::traits::EntryParser;

const TOKEN: &str = "PerformanceFilesize";

/// System-app origin every filesize sample is attributed to; file sizes are
/// a property of the installed image, not of any one application.
const SYSTEM_CONTEXT: &str = "system.gaiamobile.org";

/// Parser for on-device file size samples.
///
/// Message format: `/path/to/file|blocks|sizeBytes`. Values arrive in
/// bytes and are stored in megabytes.
pub struct FilesizeParser;

impl EntryParser for FilesizeParser {
    fn kind(&self) -> EntryKind {
        EntryKind::Filesize
    }

    fn matches(&self, line: &LogLine) -> bool {
        line.tag.as_deref() == Some(TOKEN)
    }

    fn decode(&self, line: &LogLine) -> Result<Entry, DecodeError> {
        let parts: Vec<&str> = line.message.split('|').collect();

        if parts.len() < 3 {
            return Err(DecodeError::Malformed("filesize", line.message.clone()));
        }

        let value: f64 = parts[2]
            .parse()
            .map_err(|_| DecodeError::InvalidNumber("filesize", parts[2].to_string()))?;

        // "/system/b2g/omni.ja" → "filesize.system/b2g/omni.ja"
        let path = parts[0].strip_prefix('/').unwrap_or(parts[0]);

        Ok(Entry::Filesize(FilesizeEntry {
            context: SYSTEM_CONTEXT.to_string(),
            name: format!("filesize.{path}"),
            value: value / 1024.0 / 1024.0,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(message: &str) -> LogLine {
        LogLine {
            tag: Some(TOKEN.into()),
            message: message.into(),
            ..LogLine::default()
        }
    }

    #[test]
    fn matches_on_tag() {
        assert!(FilesizeParser.matches(&line("/a|1|2")));
    }

    #[test]
    fn decode_fixes_context_and_prefixes_name() {
        let entry = FilesizeParser
            .decode(&line("/system/b2g/omni.ja|1234|20480"))
            .expect("filesize sample should decode");

        match entry {
            Entry::Filesize(e) => {
                assert_eq!(e.context, SYSTEM_CONTEXT);
                assert_eq!(e.name, "filesize.system/b2g/omni.ja");
                assert_eq!(e.value, 20480.0 / 1024.0 / 1024.0);
            }
            other => panic!("expected filesize entry, got {other:?}"),
        }
    }

    #[test]
    fn decode_truncated_message_errors() {
        assert!(FilesizeParser.decode(&line("/a|1")).is_err());
    }
}

use crate::parser::model::{
    DecodeError, Entry, EntryKind, LogLine, PerformanceEntry, PerformanceKind,
};
use crate::parser::traits::EntryParser;

const TOKEN: &str = "PerformanceTiming";
const OLD_TOKEN: &str = "Performance Entry: ";

/// Parser for platform performance marks and measures.
///
/// Message format: `context|entryType|name[@host]|startTime|duration|epoch`.
/// A `name@host` suffix attributes the entry to the host origin instead of
/// the logging context (the system app logs on behalf of child frames).
pub struct PerformanceParser;

impl EntryParser for PerformanceParser {
    fn kind(&self) -> EntryKind {
        EntryKind::Performance
    }

    fn matches(&self, line: &LogLine) -> bool {
        line.tag.as_deref() == Some(TOKEN)
    }

    fn decode(&self, line: &LogLine) -> Result<Entry, DecodeError> {
        let message = line
            .message
            .strip_prefix(OLD_TOKEN)
            .unwrap_or(&line.message);
        let parts: Vec<&str> = message.split('|').collect();

        if parts.len() < 6 {
            return Err(DecodeError::Malformed("performance", line.message.clone()));
        }

        let number = |s: &str| -> Result<f64, DecodeError> {
            s.parse()
                .map_err(|_| DecodeError::InvalidNumber("performance", s.to_string()))
        };

        let (name, host) = match parts[2].split_once('@') {
            Some((name, host)) => (name, Some(host)),
            None => (parts[2], None),
        };

        let context = match host {
            Some(host) => host_of(host).to_string(),
            None => parts[0].to_string(),
        };

        let entry_type = match parts[1] {
            "mark" => PerformanceKind::Mark,
            "measure" => PerformanceKind::Measure,
            other => return Err(DecodeError::Malformed("performance", other.to_string())),
        };

        Ok(Entry::Performance(PerformanceEntry {
            entry_type,
            name: name.to_string(),
            context,
            entry_point: None,
            start_time: number(parts[3])?,
            duration: number(parts[4])?,
            epoch: number(parts[5])? as i64,
            pid: line.pid,
        }))
    }
}

/// Extract the host portion from an origin-ish string, e.g.
/// `app://clock.gaiamobile.org/index.html` → `clock.gaiamobile.org`.
/// A bare host passes through unchanged.
fn host_of(origin: &str) -> &str {
    let rest = origin
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(origin);

    rest.split(['/', ':']).next().unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(message: &str) -> LogLine {
        LogLine {
            tag: Some(TOKEN.into()),
            pid: Some(123),
            message: message.into(),
            ..LogLine::default()
        }
    }

    #[test]
    fn matches_on_tag() {
        assert!(PerformanceParser.matches(&line("x|mark|y|0|0|1")));
        assert!(!PerformanceParser.matches(&LogLine {
            tag: Some("PerformanceMemory".into()),
            ..LogLine::default()
        }));
    }

    #[test]
    fn decode_mark() {
        let entry = PerformanceParser
            .decode(&line("system.gaiamobile.org|mark|appLaunch|0|0|1000"))
            .expect("mark should decode");

        match entry {
            Entry::Performance(e) => {
                assert_eq!(e.context, "system.gaiamobile.org");
                assert_eq!(e.entry_type, PerformanceKind::Mark);
                assert_eq!(e.name, "appLaunch");
                assert_eq!(e.epoch, 1000);
                assert_eq!(e.pid, Some(123));
            }
            other => panic!("expected performance entry, got {other:?}"),
        }
    }

    #[test]
    fn decode_measure_keeps_duration() {
        let entry = PerformanceParser
            .decode(&line("clock.gaiamobile.org|measure|navigationLoaded|120.5|340.25|1456"))
            .expect("measure should decode");

        match entry {
            Entry::Performance(e) => {
                assert_eq!(e.entry_type, PerformanceKind::Measure);
                assert_eq!(e.start_time, 120.5);
                assert_eq!(e.duration, 340.25);
            }
            other => panic!("expected performance entry, got {other:?}"),
        }
    }

    #[test]
    fn decode_name_at_host_overrides_context() {
        let entry = PerformanceParser
            .decode(&line(
                "system.gaiamobile.org|mark|fullyLoaded@app://clock.gaiamobile.org/index.html|0|0|99",
            ))
            .expect("mark should decode");

        match entry {
            Entry::Performance(e) => {
                assert_eq!(e.name, "fullyLoaded");
                assert_eq!(e.context, "clock.gaiamobile.org");
            }
            other => panic!("expected performance entry, got {other:?}"),
        }
    }

    #[test]
    fn decode_bare_host_suffix() {
        let entry = PerformanceParser
            .decode(&line("system.gaiamobile.org|mark|fullyLoaded@clock.gaiamobile.org|0|0|99"))
            .expect("mark should decode");
        assert_eq!(entry.context(), "clock.gaiamobile.org");
    }

    #[test]
    fn decode_legacy_prefix_is_stripped() {
        let entry = PerformanceParser
            .decode(&line("Performance Entry: system.gaiamobile.org|mark|appLaunch|0|0|1000"))
            .expect("legacy-prefixed line should decode");
        assert_eq!(entry.name(), "appLaunch");
    }

    #[test]
    fn decode_truncated_message_errors() {
        assert!(PerformanceParser.decode(&line("system|mark|x")).is_err());
    }

    #[test]
    fn decode_non_numeric_epoch_errors() {
        assert!(PerformanceParser
            .decode(&line("system|mark|x|0|0|not-a-number"))
            .is_err());
    }
}

use crate::parser::model::{DecodeError, Entry, EntryKind, LogLine, MemoryEntry};
use crate::parser::traits::EntryParser;

const TOKEN: &str = "PerformanceMemory";

/// Parser for application memory samples.
///
/// Message format: `context|name|valueMB` where name is one of uss, pss,
/// rss. Values arrive in megabytes and are stored in bytes.
pub struct MemoryParser;

impl EntryParser for MemoryParser {
    fn kind(&self) -> EntryKind {
        EntryKind::Memory
    }

    fn matches(&self, line: &LogLine) -> bool {
        line.tag.as_deref() == Some(TOKEN)
    }

    fn decode(&self, line: &LogLine) -> Result<Entry, DecodeError> {
        let parts: Vec<&str> = line.message.split('|').collect();

        if parts.len() < 3 {
            return Err(DecodeError::Malformed("memory", line.message.clone()));
        }

        let value: f64 = parts[2]
            .parse()
            .map_err(|_| DecodeError::InvalidNumber("memory", parts[2].to_string()))?;

        Ok(Entry::Memory(MemoryEntry {
            context: parts[0].to_string(),
            name: parts[1].to_string(),
            entry_point: None,
            value: value * 1024.0 * 1024.0,
            pid: line.pid,
        }))
    }
}

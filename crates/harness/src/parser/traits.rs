pub use super::model::{DecodeError, Entry, EntryKind, LogLine};

/// A predicate + decode pair turning matched log lines into typed entries.
///
/// Matchers are tried in registration order and the first match wins, so a
/// parser's `matches` only needs to be exact enough relative to the parsers
/// registered before it. `decode` is only ever invoked on lines `matches`
/// accepted; a decode failure drops the line, it is never fatal.
pub trait EntryParser: Send + Sync {
    fn kind(&self) -> EntryKind;
    fn matches(&self, line: &LogLine) -> bool;
    fn decode(&self, line: &LogLine) -> Result<Entry, DecodeError>;
}

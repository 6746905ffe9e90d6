use tracing::debug;

use super::traits::{Entry, EntryParser, LogLine};

/// Ordered collection of registered entry parsers.
///
/// Registration order is the matching order: at most one parser handles a
/// given line. A line no parser accepts produces no entry and is not an
/// error condition.
#[derive(Default)]
pub struct ParserRegistry {
    parsers: Vec<Box<dyn EntryParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard parser set every phase starts from.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(super::formats::PerformanceParser));
        registry.register(Box::new(super::formats::MemoryParser));
        registry
    }

    pub fn register(&mut self, parser: Box<dyn EntryParser>) {
        self.parsers.push(parser);
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// Match a classified line against the registered parsers and decode it
    /// with the first one that accepts. Decode failures drop the line with
    /// a diagnostic; they must never crash the dispatcher or stall the
    /// stream.
    pub fn dispatch(&self, line: &LogLine) -> Option<Entry> {
        for parser in &self.parsers {
            if !parser.matches(line) {
                continue;
            }

            return match parser.decode(line) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!(
                        kind = parser.kind().as_str(),
                        message = %line.message,
                        error = %err,
                        "dropping undecodable matched line"
                    );
                    None
                }
            };
        }

        None
    }
}

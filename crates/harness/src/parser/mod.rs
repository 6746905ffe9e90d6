//! Log parsing: classification of raw device log lines and decoding of
//! matched lines into typed measurement entries.
//!
//! - `classify.rs`: ordered line-shape patterns → [`LogLine`]
//! - `traits.rs`: the predicate + decode parser contract
//! - `registry.rs`: ordered first-match-wins parser registry
//! - `formats/`: the built-in entry parsers (performance, memory, filesize)

pub mod classify;
pub mod formats;
pub mod model;
pub mod registry;
pub mod traits;

pub use classify::classify;
pub use model::{
    DecodeError, Entry, EntryKind, FilesizeEntry, LogLine, MemoryEntry, PerformanceEntry,
    PerformanceKind,
};
pub use registry::ParserRegistry;
pub use traits::EntryParser;

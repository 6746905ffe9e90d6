use thiserror::Error;

/// A classified device log line. Ephemeral: produced by the classifier for
/// each incoming raw line and discarded after parser matching. Fields absent
/// in a given line shape stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogLine {
    pub level: Option<String>,
    pub timestamp: Option<String>,
    pub pid: Option<u32>,
    pub tid: Option<String>,
    pub tag: Option<String>,
    pub message: String,
}

/// Which family of typed entries a parser produces. Doubles as the event
/// kind waiters subscribe on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Performance,
    Memory,
    Filesize,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Performance => "performanceentry",
            EntryKind::Memory => "memoryentry",
            EntryKind::Filesize => "filesizeentry",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceKind {
    Mark,
    Measure,
}

impl PerformanceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceKind::Mark => "mark",
            PerformanceKind::Measure => "measure",
        }
    }
}

/// A performance mark or measure emitted by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceEntry {
    pub entry_type: PerformanceKind,
    pub name: String,
    /// Origin the measurement is attributed to.
    pub context: String,
    /// Application entry point, attached by capture when configured.
    pub entry_point: Option<String>,
    pub start_time: f64,
    pub duration: f64,
    /// Epoch milliseconds; the ordering reference within a trial.
    pub epoch: i64,
    pub pid: Option<u32>,
}

/// A memory sample (uss / pss / rss) for one context, value in bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    pub context: String,
    pub name: String,
    pub entry_point: Option<String>,
    pub value: f64,
    pub pid: Option<u32>,
}

/// An on-device file size sample, value in megabytes.
#[derive(Debug, Clone, PartialEq)]
pub struct FilesizeEntry {
    pub context: String,
    pub name: String,
    pub value: f64,
}

/// A typed, decoded measurement unit derived from a device log line.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Performance(PerformanceEntry),
    Memory(MemoryEntry),
    Filesize(FilesizeEntry),
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Performance(_) => EntryKind::Performance,
            Entry::Memory(_) => EntryKind::Memory,
            Entry::Filesize(_) => EntryKind::Filesize,
        }
    }

    pub fn context(&self) -> &str {
        match self {
            Entry::Performance(e) => &e.context,
            Entry::Memory(e) => &e.context,
            Entry::Filesize(e) => &e.context,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entry::Performance(e) => &e.name,
            Entry::Memory(e) => &e.name,
            Entry::Filesize(e) => &e.name,
        }
    }

    /// Epoch milliseconds usable for ordering within a trial. Memory and
    /// filesize entries are valued by their own sample, not elapsed time,
    /// so they carry no epoch.
    pub fn epoch(&self) -> Option<i64> {
        match self {
            Entry::Performance(e) => Some(e.epoch),
            _ => None,
        }
    }

    pub fn set_entry_point(&mut self, entry_point: &str) {
        match self {
            Entry::Performance(e) => e.entry_point = Some(entry_point.to_string()),
            Entry::Memory(e) => e.entry_point = Some(entry_point.to_string()),
            Entry::Filesize(_) => {}
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed {0} message: {1:?}")]
    Malformed(&'static str, String),

    #[error("invalid number in {0} message: {1:?}")]
    InvalidNumber(&'static str, String),
}

use std::time::Duration;
use thiserror::Error;

use crate::device::DeviceError;
use crate::session::SessionError;

/// Fatal suite errors. Anything that surfaces as one of these terminates
/// the whole suite; recoverable conditions (decode failures, unclassified
/// lines, a timed-out try within the retry budget) are absorbed lower down.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A run failed to complete within the configured window and the retry
    /// budget is exhausted.
    #[error("test timeout exceeded {0:?}")]
    Timeout(Duration),

    /// A remote device call failed. Not retried.
    #[error("device transport error: {0}")]
    Transport(#[from] DeviceError),

    #[error("automation session error: {0}")]
    Session(#[from] SessionError),

    /// The formatter found no start marker in a completed run's entries.
    /// Signals an event-correlation defect, never silently skipped.
    #[error("missing start mark \"{0}\" in captured entries")]
    MissingStartMark(String),

    /// The device log stream ended while a run was still waiting on it.
    #[error("device log stream closed unexpectedly")]
    StreamClosed,

    #[error("invalid configuration: {0}")]
    Config(String),

    /// A test-definition hook (setup / afterEach / teardown) failed.
    #[error("test hook failed: {0}")]
    Hook(#[source] anyhow::Error),
}

impl HarnessError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, HarnessError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_timeout() {
        assert!(HarnessError::Timeout(Duration::from_secs(60)).is_timeout());
    }

    #[test]
    fn other_errors_are_not_timeout() {
        assert!(!HarnessError::MissingStartMark("appLaunch".into()).is_timeout());
        assert!(!HarnessError::StreamClosed.is_timeout());
    }

    #[test]
    fn display_includes_mark_name() {
        let err = HarnessError::MissingStartMark("deviceReboot".into());
        assert!(err.to_string().contains("deviceReboot"));
    }
}

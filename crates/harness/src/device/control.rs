use std::collections::HashMap;
use std::path::PathBuf;
use std::pin::Pin;

use async_trait::async_trait;
use thiserror::Error;
use tokio_stream::Stream;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("device service returned {status} for {endpoint}")]
    Status { status: u16, endpoint: String },

    #[error("unexpected device service response: {0}")]
    InvalidResponse(String),

    #[error("log sink i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build revisions reported by the device, identifying the software under
/// test. Hashed together they form the revision fingerprint every reported
/// point is tagged with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildRevisions {
    pub gaia: String,
    pub gecko: String,
}

/// Raw device log lines as a push-based stream. Dropping the stream closes
/// the underlying connection, which is the only cancellation primitive.
pub type LineStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Remote-control surface of the target device.
///
/// All operations are thin wrappers over the device service and may fail
/// with a transport error; the phase treats those as fatal except where its
/// retry policy is explicitly wired in.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    /// Restart the platform process without rebooting the device.
    async fn restart(&self) -> Result<(), DeviceError>;

    /// Full device reboot.
    async fn hard_reboot(&self) -> Result<(), DeviceError>;

    /// Clear the device's log buffer.
    async fn clear_log(&self) -> Result<(), DeviceError>;

    /// Write a performance mark into the device log with the given epoch
    /// time, attributed to the system app.
    async fn mark(&self, name: &str, epoch_ms: i64) -> Result<(), DeviceError>;

    /// Sample uss/pss/rss for a process and write the three samples into
    /// the device log attributed to `context`.
    async fn write_memory_sample(&self, pid: u32, context: &str) -> Result<(), DeviceError>;

    async fn kill_process(&self, pid: u32) -> Result<(), DeviceError>;

    /// Reset cached input state so synthetic events are never swallowed by
    /// kernel-side deduplication after a platform restart.
    async fn reset_input_state(&self) -> Result<(), DeviceError>;

    async fn tap(&self, x: u32, y: u32) -> Result<(), DeviceError>;

    /// Forward a device port; resolves with the local port to connect to.
    async fn forward_port(&self, remote_port: u16) -> Result<u16, DeviceError>;

    async fn build_revisions(&self) -> Result<BuildRevisions, DeviceError>;

    async fn properties(&self) -> Result<HashMap<String, String>, DeviceError>;

    /// Open the live device log as a line stream, optionally teeing every
    /// raw line to a sink file.
    async fn open_log_stream(&self, sink: Option<PathBuf>) -> Result<LineStream, DeviceError>;
}

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("automation protocol violation: {0}")]
    Protocol(String),

    #[error("remote command failed: {0}")]
    Command(String),
}

/// Deferred session construction. Sessions are transient: established for
/// one interaction sequence and torn down right after, since a platform
/// restart invalidates any open connection.
pub type SessionFuture =
    futures::future::BoxFuture<'static, Result<Box<dyn AutomationSession>, SessionError>>;
pub type SessionFactory = Box<dyn Fn() -> SessionFuture + Send + Sync>;

/// Scripted-automation surface of the device, reached over a forwarded
/// port. Used for the few interactions the log stream cannot express, all
/// of them executed inside the running platform.
#[async_trait]
pub trait AutomationSession: Send + Sync {
    async fn start_session(&mut self) -> Result<(), SessionError>;

    async fn delete_session(&mut self) -> Result<(), SessionError>;

    /// Ask the platform to minimize memory so samples reflect a settled
    /// heap rather than collectible garbage.
    async fn trigger_memory_minimization(&mut self) -> Result<(), SessionError>;

    /// Clear the platform's performance entry buffers so long suites never
    /// hit the buffer ceiling and silently drop entries.
    async fn clear_performance_buffer(&mut self) -> Result<(), SessionError>;

    /// Screen coordinates of the launch icon for an app, center of its
    /// bounding box.
    async fn icon_coordinates(
        &mut self,
        app: &str,
        entry_point: Option<&str>,
    ) -> Result<(u32, u32), SessionError>;
}

//! Scripted automation over a forwarded device port.

pub mod api;
pub mod marionette;

#[cfg(test)]
pub mod mock;

pub use api::{AutomationSession, SessionError, SessionFactory, SessionFuture};
pub use marionette::MarionetteSession;

//! Dispatch module — live log stream lifecycle, entry fan-out, and the
//! structured wait primitives built on it.

pub mod dispatcher;
pub mod wait;

pub use dispatcher::Dispatcher;

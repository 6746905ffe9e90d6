//! Device boundary: the remote-control trait, its HTTP implementation
//! against the device service, and a scriptable double for tests.

pub mod control;
pub mod http;

#[cfg(test)]
pub mod mock;

pub use control::{BuildRevisions, DeviceControl, DeviceError, LineStream};
pub use http::HttpDevice;

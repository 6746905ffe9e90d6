// Domain-driven module structure for the measurement harness.

// Core infrastructure
pub mod dispatch;
pub mod error;
pub mod parser;

// Device boundary
pub mod device;
pub mod session;

// Domain modules
pub mod cli;
pub mod conf;
pub mod phase;
pub mod report;
pub mod runtime;

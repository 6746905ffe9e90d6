//! Configuration: defaults, TOML file, environment, then CLI flags.

pub mod load;
pub mod model;

pub use model::{HarnessConfig, OutputMode, PhaseKind};

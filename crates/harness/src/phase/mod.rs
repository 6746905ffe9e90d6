//! The run-orchestration core: a driver that owns the run/try loop and its
//! timeout/retry policy, a shared trial context with a generation-fenced
//! capture buffer, and the scenarios that define what one trial does.

pub mod coldlaunch;
pub mod core;
pub mod driver;
pub mod hooks;
pub mod reboot;
pub mod scenario;
pub mod state;

pub use coldlaunch::ColdLaunch;
pub use core::PhaseCore;
pub use driver::Phase;
pub use hooks::{Hook, TestHooks};
pub use reboot::Reboot;
pub use scenario::{CaptureFilter, Scenario};
pub use state::PhaseState;

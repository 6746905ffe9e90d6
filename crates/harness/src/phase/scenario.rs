use async_trait::async_trait;

use super::core::PhaseCore;
use crate::error::HarnessError;
use crate::parser::Entry;

/// Per-try entry admission. The driver installs a fresh filter at the start
/// of every try, so filters may carry per-try state (a "fully loaded seen"
/// latch, for instance) without explicit resets.
///
/// `accept` may rewrite the entry before it is captured; reboot scenarios
/// use this to repair device clocks that reset across a reboot.
pub trait CaptureFilter: Send + 'static {
    fn accept(&mut self, entry: &mut Entry) -> bool;
}

/// What one kind of measurement suite actually does. The driver owns the
/// run/try loop, the timeout, and reporting; a scenario contributes the
/// work of a single trial and its recovery.
#[async_trait]
pub trait Scenario: Send {
    /// Phase identifier used in reported tags and log output.
    fn name(&self) -> &'static str;

    /// Human-facing description, e.g. `Cold Launch: clock`.
    fn title(&self) -> String;

    /// Name of the performance mark every run is measured relative to.
    fn start_mark(&self) -> &'static str;

    /// One-time preparation before the first run.
    async fn warmup(&mut self, core: &mut PhaseCore) -> Result<(), HarnessError>;

    /// Fresh admission filter for the try about to start.
    fn capture_filter(&self, core: &PhaseCore) -> Box<dyn CaptureFilter>;

    /// One trial. Runs under the configured timeout; resolving means the
    /// trial's entries are fully captured.
    async fn test_run(&mut self, core: &mut PhaseCore) -> Result<(), HarnessError>;

    /// Recover state invalidated by a timed-out try before the re-attempt.
    async fn retry(&mut self, core: &mut PhaseCore) -> Result<(), HarnessError>;

    async fn teardown(&mut self, _core: &mut PhaseCore) -> Result<(), HarnessError> {
        Ok(())
    }
}

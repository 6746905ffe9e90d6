/// Lifecycle of a measurement suite. Transitions are driven exclusively by
/// the phase driver; scenarios never touch state directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    /// Constructed, nothing started yet.
    Idle,
    /// One-time device preparation before the first run.
    Warming,
    /// A try of a run is in flight under its timeout.
    Running { run: u32, attempt: u32 },
    /// A try timed out and recovery is in progress before the re-attempt.
    Retrying { run: u32, attempt: u32 },
    /// All runs complete, aggregating and tearing down.
    Ending,
    Ended,
    /// A fatal error terminated the suite.
    Failed,
}

impl std::fmt::Display for PhaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseState::Idle => write!(f, "idle"),
            PhaseState::Warming => write!(f, "warming"),
            PhaseState::Running { run, attempt } => {
                write!(f, "running run {run} attempt {attempt}")
            }
            PhaseState::Retrying { run, attempt } => {
                write!(f, "retrying run {run} attempt {attempt}")
            }
            PhaseState::Ending => write!(f, "ending"),
            PhaseState::Ended => write!(f, "ended"),
            PhaseState::Failed => write!(f, "failed"),
        }
    }
}

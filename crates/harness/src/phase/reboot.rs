//! Reboot suites: measure the platform reaching readiness after a full
//! device reboot, or after restarting only the platform process.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use super::core::PhaseCore;
use super::scenario::{CaptureFilter, Scenario};
use crate::error::HarnessError;
use crate::parser::{Entry, PerformanceKind};
use crate::session::SessionFactory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RebootMode {
    /// Full device reboot.
    Full,
    /// Restart only the platform process, leaving the device up.
    PlatformOnly,
}

pub struct Reboot {
    mode: RebootMode,
    sessions: SessionFactory,
    entry_point: Option<String>,
    /// Wall-clock time the restart was initiated, shared with the capture
    /// filter which stamps it onto the start mark.
    start_time: Arc<AtomicI64>,
}

impl Reboot {
    pub fn full(config: &crate::conf::HarnessConfig, sessions: SessionFactory) -> Self {
        Self::with_mode(config, sessions, RebootMode::Full)
    }

    pub fn platform_only(config: &crate::conf::HarnessConfig, sessions: SessionFactory) -> Self {
        Self::with_mode(config, sessions, RebootMode::PlatformOnly)
    }

    fn with_mode(
        config: &crate::conf::HarnessConfig,
        sessions: SessionFactory,
        mode: RebootMode,
    ) -> Self {
        Self {
            mode,
            sessions,
            entry_point: config.entry_point.clone(),
            start_time: Arc::new(AtomicI64::new(0)),
        }
    }

    fn make_filter(&self, core: &PhaseCore) -> Box<dyn CaptureFilter> {
        Box::new(RebootFilter {
            start_mark: self.start_mark(),
            start_time: Arc::clone(&self.start_time),
            entry_point: self.entry_point.clone(),
            homescreen: core.config.homescreen.clone(),
            system: core.config.system.clone(),
            homescreen_loaded: false,
            system_loaded: false,
        })
    }
}

#[async_trait]
impl Scenario for Reboot {
    fn name(&self) -> &'static str {
        match self.mode {
            RebootMode::Full => "reboot",
            RebootMode::PlatformOnly => "restartb2g",
        }
    }

    fn title(&self) -> String {
        match self.mode {
            RebootMode::Full => "Reboot".to_string(),
            RebootMode::PlatformOnly => "Restart B2G".to_string(),
        }
    }

    fn start_mark(&self) -> &'static str {
        match self.mode {
            RebootMode::Full => "deviceReboot",
            RebootMode::PlatformOnly => "deviceB2GStart",
        }
    }

    async fn warmup(&mut self, _core: &mut PhaseCore) -> Result<(), HarnessError> {
        // Every run reboots from scratch; there is nothing to warm.
        Ok(())
    }

    fn capture_filter(&self, core: &PhaseCore) -> Box<dyn CaptureFilter> {
        self.make_filter(core)
    }

    async fn test_run(&mut self, core: &mut PhaseCore) -> Result<(), HarnessError> {
        core.reset_boot_state();
        core.device.clear_log().await?;

        let start = Utc::now().timestamp_millis();
        self.start_time.store(start, Ordering::SeqCst);

        info!(mode = ?self.mode, "restarting device");
        match self.mode {
            RebootMode::Full => core.device.hard_reboot().await?,
            RebootMode::PlatformOnly => core.device.restart().await?,
        }

        // The restart killed the connection behind the log stream; capture
        // resumes on the fresh stream within the same try.
        core.reattach_stream().await?;
        let filter = self.make_filter(core);
        core.resume_capture(filter);

        core.device.mark(self.start_mark(), start).await?;
        core.wait_for_b2g_start().await?;

        let homescreen = core.config.homescreen.clone();
        let system = core.config.system.clone();
        let homescreen_pid = core.homescreen_pid.ok_or_else(|| {
            HarnessError::Config("homescreen pid unknown after startup".to_string())
        })?;
        let system_pid = core
            .system_pid
            .ok_or_else(|| HarnessError::Config("system pid unknown after startup".to_string()))?;

        let delay = Duration::from_millis(core.config.memory_delay_ms);
        let device = Arc::clone(&core.device);
        let wait_homescreen = core.dispatcher.wait_for_memory(&homescreen);
        let wait_system = core.dispatcher.wait_for_memory(&system);
        let sample = async {
            tokio::time::sleep(delay).await;

            let mut session = (self.sessions)().await?;
            session.start_session().await?;
            session.trigger_memory_minimization().await?;
            session.delete_session().await?;

            device.write_memory_sample(homescreen_pid, &homescreen).await?;
            device.write_memory_sample(system_pid, &system).await?;
            Ok::<(), HarnessError>(())
        };

        let (homescreen_memory, system_memory, sampled) =
            tokio::join!(wait_homescreen, wait_system, sample);
        sampled?;
        homescreen_memory?;
        system_memory?;
        Ok(())
    }

    async fn retry(&mut self, _core: &mut PhaseCore) -> Result<(), HarnessError> {
        // The next try reboots from scratch anyway.
        Ok(())
    }
}

struct RebootFilter {
    start_mark: &'static str,
    start_time: Arc<AtomicI64>,
    entry_point: Option<String>,
    homescreen: String,
    system: String,
    homescreen_loaded: bool,
    system_loaded: bool,
}

impl CaptureFilter for RebootFilter {
    /// Captured entries: every measure and memory sample, plus marks up to
    /// the point where both homescreen and system have finished loading.
    /// Device clocks are unreliable across a reboot, so entry epochs are
    /// overwritten with host wall-clock time.
    fn accept(&mut self, entry: &mut Entry) -> bool {
        match entry {
            Entry::Performance(performance) => {
                performance.epoch = if performance.name == self.start_mark {
                    self.start_time.load(Ordering::SeqCst)
                } else {
                    Utc::now().timestamp_millis()
                };

                let ignore = self.homescreen_loaded
                    && self.system_loaded
                    && performance.entry_type == PerformanceKind::Mark
                    && performance.name != self.start_mark;

                if performance.context == self.homescreen && performance.name == "fullyLoaded" {
                    self.homescreen_loaded = true;
                }
                if performance.context == self.system
                    && (performance.name == "fullyLoaded" || performance.name == "osLogoEnd")
                {
                    self.system_loaded = true;
                }

                if ignore {
                    return false;
                }
                performance.entry_point = self.entry_point.clone();
                true
            }
            Entry::Memory(memory) => {
                memory.entry_point = self.entry_point.clone();
                true
            }
            Entry::Filesize(_) => false,
        }
    }
}

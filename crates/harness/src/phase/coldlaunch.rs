//! Cold-launch suite: measure an application starting from a fresh process,
//! launched by tapping its homescreen icon.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::core::PhaseCore;
use super::scenario::{CaptureFilter, Scenario};
use crate::error::HarnessError;
use crate::parser::{Entry, PerformanceEntry, PerformanceKind};
use crate::session::SessionFactory;

// Launches between performance-buffer clears. Marking degrades once the
// platform's entry buffer fills, so long suites clear it periodically.
const PERFORMANCE_BUFFER_SAFETY: u32 = 50;

// Tap slightly inside the icon's bounds rather than at its exact corner.
const ICON_TAP_OFFSET: u32 = 20;

pub struct ColdLaunch {
    app: String,
    app_label: String,
    entry_point: Option<String>,
    sessions: SessionFactory,
    icon: Option<(u32, u32)>,
    app_pid: Option<u32>,
    launches_buffered: u32,
}

impl ColdLaunch {
    pub fn new(
        config: &crate::conf::HarnessConfig,
        sessions: SessionFactory,
    ) -> Result<Self, HarnessError> {
        let app = config
            .app_origin()
            .ok_or_else(|| HarnessError::Config("an app is required for coldlaunch".to_string()))?;
        let app_label = config.app.clone().unwrap_or_else(|| app.clone());

        Ok(Self {
            app,
            app_label,
            entry_point: config.entry_point.clone(),
            sessions,
            icon: None,
            app_pid: None,
            launches_buffered: 0,
        })
    }

    /// Locate the launch icon on the homescreen and cache its tap target.
    async fn refresh_coordinates(&mut self) -> Result<(), HarnessError> {
        let mut session = (self.sessions)().await?;
        session.start_session().await?;
        let (x, y) = session
            .icon_coordinates(&self.app, self.entry_point.as_deref())
            .await?;
        session.delete_session().await?;

        let target = (x + ICON_TAP_OFFSET, y + ICON_TAP_OFFSET);
        debug!(x = target.0, y = target.1, "launch icon located");
        self.icon = Some(target);
        Ok(())
    }

    /// Tap the icon after the configured settle delay and resolve once the
    /// app reports itself fully loaded.
    async fn launch(&self, core: &PhaseCore) -> Result<PerformanceEntry, HarnessError> {
        let (x, y) = self.icon.ok_or_else(|| {
            HarnessError::Config("launch icon coordinates not resolved".to_string())
        })?;
        core.device.reset_input_state().await?;

        let delay = Duration::from_millis(core.config.launch_delay_ms);
        let device = Arc::clone(&core.device);
        let wait = core.dispatcher.wait_for_entry("fullyLoaded", &self.app);
        let tap = async {
            tokio::time::sleep(delay).await;
            device.tap(x, y).await
        };

        let (entry, tapped) = tokio::join!(wait, tap);
        tapped?;
        entry
    }

    /// Remember the launched app's process, distinguishing it from the
    /// homescreen's own.
    fn capture_entry_metadata(&mut self, core: &PhaseCore, entry: &PerformanceEntry) {
        if self.app_pid.is_none() && entry.pid != core.homescreen_pid {
            debug!(pid = ?entry.pid, "application pid captured");
            self.app_pid = entry.pid;
        }
    }

    async fn close_app(&mut self, core: &PhaseCore) -> Result<(), HarnessError> {
        if let Some(pid) = self.app_pid.take() {
            core.device.kill_process(pid).await?;
        }
        Ok(())
    }

    /// Launch once and close again, so first-use work (database creation,
    /// cache priming) never lands in the measured runs.
    async fn prime(&mut self, core: &mut PhaseCore) -> Result<(), HarnessError> {
        info!("priming application");
        let entry = self.launch(core).await?;
        self.capture_entry_metadata(core, &entry);
        self.close_app(core).await
    }

    async fn prevent_buffer_overflow(&mut self) -> Result<(), HarnessError> {
        if self.launches_buffered < PERFORMANCE_BUFFER_SAFETY {
            return Ok(());
        }

        let mut session = (self.sessions)().await?;
        session.start_session().await?;
        session.clear_performance_buffer().await?;
        session.delete_session().await?;
        self.launches_buffered = 0;
        Ok(())
    }
}

#[async_trait]
impl Scenario for ColdLaunch {
    fn name(&self) -> &'static str {
        "coldlaunch"
    }

    fn title(&self) -> String {
        format!("Cold Launch: {}", self.app_label)
    }

    fn start_mark(&self) -> &'static str {
        "appLaunch"
    }

    async fn warmup(&mut self, core: &mut PhaseCore) -> Result<(), HarnessError> {
        core.device.clear_log().await?;
        core.device.restart().await?;
        core.wait_for_b2g_start().await?;
        self.refresh_coordinates().await?;
        self.prime(core).await
    }

    fn capture_filter(&self, _core: &PhaseCore) -> Box<dyn CaptureFilter> {
        Box::new(ColdLaunchFilter {
            app: self.app.clone(),
            entry_point: self.entry_point.clone(),
            start_mark: self.start_mark(),
            fully_loaded: false,
        })
    }

    async fn test_run(&mut self, core: &mut PhaseCore) -> Result<(), HarnessError> {
        self.prevent_buffer_overflow().await?;
        self.close_app(core).await?;

        let entry = self.launch(core).await?;
        self.launches_buffered += 1;
        self.capture_entry_metadata(core, &entry);

        let pid = self.app_pid.or(entry.pid).ok_or_else(|| {
            HarnessError::Config("no pid observed for the launched app".to_string())
        })?;

        let delay = Duration::from_millis(core.config.memory_delay_ms);
        let device = Arc::clone(&core.device);
        let wait = core.dispatcher.wait_for_memory(&self.app);
        let sample = async {
            tokio::time::sleep(delay).await;

            let mut session = (self.sessions)().await?;
            session.start_session().await?;
            session.trigger_memory_minimization().await?;
            session.delete_session().await?;

            device.write_memory_sample(pid, &entry.context).await?;
            Ok::<(), HarnessError>(())
        };

        let (memory, sampled) = tokio::join!(wait, sample);
        sampled?;
        memory.map(|_entry| ())
    }

    async fn retry(&mut self, core: &mut PhaseCore) -> Result<(), HarnessError> {
        self.close_app(core).await?;
        self.refresh_coordinates().await
    }
}

struct ColdLaunchFilter {
    app: String,
    entry_point: Option<String>,
    start_mark: &'static str,
    fully_loaded: bool,
}

impl CaptureFilter for ColdLaunchFilter {
    /// Captured entries: measures and memory belonging to the tested app,
    /// plus marks up to and including fullyLoaded. Marks after that point
    /// are routine platform noise, except the start mark itself.
    fn accept(&mut self, entry: &mut Entry) -> bool {
        match entry {
            Entry::Performance(performance) => {
                if self.fully_loaded
                    && performance.entry_type == PerformanceKind::Mark
                    && performance.name != self.start_mark
                {
                    return false;
                }
                if performance.context != self.app {
                    return false;
                }
                if performance.name == "fullyLoaded" {
                    self.fully_loaded = true;
                }
                performance.entry_point = self.entry_point.clone();
                true
            }
            Entry::Memory(memory) => {
                if memory.context != self.app {
                    return false;
                }
                memory.entry_point = self.entry_point.clone();
                true
            }
            Entry::Filesize(_) => false,
        }
    }
}

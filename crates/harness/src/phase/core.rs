//! Shared trial context: the device handle, the dispatcher attached to its
//! log stream, suite identity for reporting, and the generation-fenced
//! capture buffer scenarios' entries land in.

use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::scenario::CaptureFilter;
use crate::conf::HarnessConfig;
use crate::device::DeviceControl;
use crate::dispatch::Dispatcher;
use crate::error::HarnessError;
use crate::parser::{Entry, ParserRegistry};
use crate::report::ReportMeta;

/// Device properties carrying this prefix become report tags.
const TAG_IDENTIFIER: &str = "persist.raptor.";

#[derive(Default)]
struct CaptureState {
    generation: u64,
    entries: Vec<Entry>,
}

pub struct PhaseCore {
    pub config: HarnessConfig,
    pub device: Arc<dyn DeviceControl>,
    pub dispatcher: Dispatcher,
    pub meta: ReportMeta,
    pub run: u32,
    pub current_try: u32,
    pub homescreen_pid: Option<u32>,
    pub system_pid: Option<u32>,
    pub homescreen_loaded: bool,
    pub system_loaded: bool,
    capture: Arc<Mutex<CaptureState>>,
    capture_task: Option<JoinHandle<()>>,
}

impl PhaseCore {
    /// Attach to the device log and compute the suite's reporting identity.
    pub async fn connect(
        config: HarnessConfig,
        device: Arc<dyn DeviceControl>,
    ) -> Result<Self, HarnessError> {
        let stream = device.open_log_stream(config.logcat_path.clone()).await?;
        let dispatcher = Dispatcher::new(stream, ParserRegistry::standard());
        let meta = build_meta(&config, device.as_ref()).await?;

        Ok(Self {
            config,
            device,
            dispatcher,
            meta,
            run: 1,
            current_try: 1,
            homescreen_pid: None,
            system_pid: None,
            homescreen_loaded: false,
            system_loaded: false,
            capture: Arc::default(),
            capture_task: None,
        })
    }

    /// Start capturing for a new try: the buffer is cleared, its generation
    /// advances, and any prior capture task is fenced out so a stale task
    /// can never deliver entries into this try's buffer.
    pub fn begin_capture(&mut self, filter: Box<dyn CaptureFilter>) {
        let generation = {
            let mut state = self.capture.lock().unwrap();
            state.generation += 1;
            state.entries.clear();
            state.generation
        };
        self.spawn_capture(filter, generation);
    }

    /// Re-subscribe capturing mid-try after the underlying stream was
    /// replaced. The buffer and its generation are left untouched.
    pub fn resume_capture(&mut self, filter: Box<dyn CaptureFilter>) {
        let generation = self.capture.lock().unwrap().generation;
        self.spawn_capture(filter, generation);
    }

    fn spawn_capture(&mut self, mut filter: Box<dyn CaptureFilter>, generation: u64) {
        if let Some(task) = self.capture_task.take() {
            task.abort();
        }

        let mut rx = self.dispatcher.subscribe();
        let capture = Arc::clone(&self.capture);

        self.capture_task = Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(mut entry) => {
                        if !filter.accept(&mut entry) {
                            continue;
                        }

                        let mut state = capture.lock().unwrap();
                        if state.generation != generation {
                            // A newer try owns the buffer now.
                            break;
                        }
                        state.entries.push(entry);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "capture task lagged behind dispatch");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    /// Snapshot of the current try's captured entries, in capture order.
    pub fn captured(&self) -> Vec<Entry> {
        self.capture.lock().unwrap().entries.clone()
    }

    /// Replace the dispatcher after the device connection behind the log
    /// stream died, e.g. across a reboot.
    pub async fn reattach_stream(&mut self) -> Result<(), HarnessError> {
        info!("reattaching device log stream");
        self.dispatcher.end();

        let stream = self
            .device
            .open_log_stream(self.config.logcat_path.clone())
            .await?;
        self.dispatcher = Dispatcher::new(stream, ParserRegistry::standard());
        Ok(())
    }

    /// Forget platform readiness, e.g. before a reboot invalidates it.
    pub fn reset_boot_state(&mut self) {
        self.homescreen_loaded = false;
        self.system_loaded = false;
        self.homescreen_pid = None;
        self.system_pid = None;
    }

    /// Resolve once the homescreen and system apps have both finished
    /// loading. The system additionally counts the end of the boot logo as
    /// loaded, whichever comes first. Process ids are recorded from the
    /// first sighting.
    pub async fn wait_for_b2g_start(&mut self) -> Result<(), HarnessError> {
        let homescreen = self.config.homescreen.clone();
        let system = self.config.system.clone();

        let (home_entry, system_entry) = tokio::join!(
            async {
                if self.homescreen_loaded {
                    return Ok(None);
                }
                debug!("waiting for homescreen");
                self.dispatcher
                    .wait_for_entry("fullyLoaded", &homescreen)
                    .await
                    .map(Some)
            },
            async {
                if self.system_loaded {
                    return Ok(None);
                }
                debug!("waiting for system");
                tokio::select! {
                    entry = self.dispatcher.wait_for_entry("fullyLoaded", &system) => entry.map(Some),
                    entry = self.dispatcher.wait_for_entry("osLogoEnd", &system) => entry.map(Some),
                }
            }
        );

        if let Some(entry) = home_entry? {
            self.homescreen_loaded = true;
            if self.homescreen_pid.is_none() {
                debug!(pid = ?entry.pid, "homescreen pid captured");
                self.homescreen_pid = entry.pid;
            }
        }
        if let Some(entry) = system_entry? {
            self.system_loaded = true;
            if self.system_pid.is_none() {
                debug!(pid = ?entry.pid, "system pid captured");
                self.system_pid = entry.pid;
            }
        }

        Ok(())
    }
}

impl Drop for PhaseCore {
    fn drop(&mut self) {
        if let Some(task) = self.capture_task.take() {
            task.abort();
        }
    }
}

fn short_revision(revision: &str) -> &str {
    revision.get(..16).unwrap_or(revision)
}

/// Reporting identity is computed exactly once per process run, at connect
/// time, never per call.
async fn build_meta(
    config: &HarnessConfig,
    device: &dyn DeviceControl,
) -> Result<ReportMeta, HarnessError> {
    let revisions = device.build_revisions().await?;
    let gaia = short_revision(&revisions.gaia).to_string();
    let gecko = short_revision(&revisions.gecko).to_string();

    let mut hasher = Sha256::new();
    hasher.update(&gaia);
    hasher.update(&gecko);
    let revision_id = format!("{:x}", hasher.finalize());

    let properties = device.properties().await?;
    let device_tags = properties
        .into_iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(TAG_IDENTIFIER)
                .map(|tag| (tag.to_string(), value))
        })
        .collect();

    Ok(ReportMeta {
        test: config
            .app
            .clone()
            .unwrap_or_else(|| config.phase.as_str().to_string()),
        phase: config.phase.as_str().to_string(),
        base_time: config.time,
        revision_id,
        gaia_revision: gaia,
        gecko_revision: gecko,
        device_tags,
    })
}

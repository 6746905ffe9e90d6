//! Suite driver: wires the device client, session factory, scenario, and
//! sinks together and runs the phase to completion.

use std::sync::Arc;

use tracing::error;

use crate::conf::{HarnessConfig, OutputMode, PhaseKind};
use crate::device::{DeviceControl, HttpDevice};
use crate::error::HarnessError;
use crate::phase::{ColdLaunch, Phase, PhaseCore, Reboot, Scenario, TestHooks};
use crate::report::FileSink;
use crate::session::{AutomationSession, MarionetteSession, SessionError, SessionFactory};

/// Run one complete suite. Any error returned here is fatal; the caller
/// turns it into a non-zero exit.
pub async fn run(config: HarnessConfig) -> Result<(), HarnessError> {
    let device: Arc<dyn DeviceControl> = Arc::new(HttpDevice::new(config.device_url.clone()));
    let sessions = session_factory(&config, Arc::clone(&device));

    let scenario: Box<dyn Scenario> = match config.phase {
        PhaseKind::Coldlaunch => Box::new(ColdLaunch::new(&config, sessions)?),
        PhaseKind::Reboot => Box::new(Reboot::full(&config, sessions)),
        PhaseKind::Restartb2g => Box::new(Reboot::platform_only(&config, sessions)),
    };

    let core = PhaseCore::connect(config.clone(), device).await?;
    let mut phase = Phase::new(core, scenario, TestHooks::new());
    if let Some(path) = &config.metrics_path {
        phase = phase.with_sink(Box::new(FileSink::new(path)));
    }

    phase.run().await.map(|_stats| ())
}

/// Sessions are transient and reach the device over a freshly forwarded
/// port each time, since restarts and reboots invalidate both.
fn session_factory(config: &HarnessConfig, device: Arc<dyn DeviceControl>) -> SessionFactory {
    let host = config.marionette_host.clone();
    let port = config.marionette_port;

    Box::new(move || {
        let host = host.clone();
        let device = Arc::clone(&device);

        Box::pin(async move {
            let local = device
                .forward_port(port)
                .await
                .map_err(|err| SessionError::Protocol(format!("port forward failed: {err}")))?;
            let session = MarionetteSession::connect(&host, local).await?;
            Ok(Box::new(session) as Box<dyn AutomationSession>)
        })
    })
}

/// Surface a fatal error the way the configured output mode expects.
pub fn report_error(err: &HarnessError, mode: OutputMode) {
    error!(error = %err, "suite aborted");

    match mode {
        OutputMode::Json => {
            eprintln!("{}", serde_json::json!({ "error": err.to_string() }));
        }
        OutputMode::Console | OutputMode::Quiet => {
            eprintln!("Aborted due to error: {err}");
        }
    }
}

//! Boot — logging init and config assembly.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;
use crate::conf::HarnessConfig;
use crate::error::HarnessError;

/// Initialise the tracing / logging subsystem. Diagnostics go to stderr so
/// stdout stays clean for the suite summary.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "harness=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Defaults, then config file, then environment, then CLI flags.
pub fn load_config(cli: Cli) -> Result<HarnessConfig, HarnessError> {
    let mut config = HarnessConfig::load().map_err(|err| HarnessError::Config(err.to_string()))?;
    cli.apply(&mut config);
    config.validate().map_err(HarnessError::Config)?;
    Ok(config)
}

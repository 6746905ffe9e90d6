//! Command line surface. Flags override whatever the config file and
//! environment provided.

use std::path::PathBuf;

use clap::Parser;

use crate::conf::{HarnessConfig, OutputMode, PhaseKind};

#[derive(Parser, Debug)]
#[command(
    name = "harness",
    version,
    about = "Device performance measurement harness"
)]
pub struct Cli {
    /// Measurement phase to run
    #[arg(value_enum)]
    pub phase: PhaseKind,

    /// Target application, a short name or a full origin
    #[arg(long)]
    pub app: Option<String>,

    /// Entry point within the target application
    #[arg(long)]
    pub entry_point: Option<String>,

    /// Number of runs in the suite
    #[arg(long)]
    pub runs: Option<u32>,

    /// Per-try timeout in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Retries allowed per run after a timed-out try
    #[arg(long)]
    pub retries: Option<u32>,

    /// Settle time before tapping the launch icon, in milliseconds
    #[arg(long)]
    pub launch_delay: Option<u64>,

    /// Settle time before sampling memory, in milliseconds
    #[arg(long)]
    pub memory_delay: Option<u64>,

    #[arg(long, value_enum)]
    pub output: Option<OutputMode>,

    /// Append every reported point to this newline-delimited JSON file
    #[arg(long)]
    pub metrics: Option<PathBuf>,

    /// Tee the raw device log to this file
    #[arg(long)]
    pub logcat: Option<PathBuf>,

    /// Device service origin, e.g. http://localhost:9090
    #[arg(long)]
    pub device_url: Option<String>,

    #[arg(long)]
    pub marionette_host: Option<String>,

    #[arg(long)]
    pub marionette_port: Option<u16>,

    /// Homescreen application origin
    #[arg(long)]
    pub homescreen: Option<String>,

    /// System application origin
    #[arg(long)]
    pub system: Option<String>,

    /// Suite base time as epoch milliseconds, instead of now
    #[arg(long)]
    pub time: Option<i64>,
}

impl Cli {
    /// Fold the flags into an already-loaded configuration.
    pub fn apply(self, config: &mut HarnessConfig) {
        config.phase = self.phase;

        macro_rules! override_field {
            ($field:ident) => {
                if let Some(value) = self.$field {
                    config.$field = value;
                }
            };
        }

        override_field!(runs);
        override_field!(retries);
        override_field!(time);

        if let Some(app) = self.app {
            config.app = Some(app);
        }
        if let Some(entry_point) = self.entry_point {
            config.entry_point = Some(entry_point);
        }
        if let Some(timeout) = self.timeout {
            config.timeout_ms = timeout;
        }
        if let Some(delay) = self.launch_delay {
            config.launch_delay_ms = delay;
        }
        if let Some(delay) = self.memory_delay {
            config.memory_delay_ms = delay;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(metrics) = self.metrics {
            config.metrics_path = Some(metrics);
        }
        if let Some(logcat) = self.logcat {
            config.logcat_path = Some(logcat);
        }
        if let Some(url) = self.device_url {
            config.device_url = url;
        }
        if let Some(host) = self.marionette_host {
            config.marionette_host = host;
        }
        if let Some(port) = self.marionette_port {
            config.marionette_port = port;
        }
        if let Some(homescreen) = self.homescreen {
            config.homescreen = homescreen;
        }
        if let Some(system) = self.system {
            config.system = system;
        }
    }
}

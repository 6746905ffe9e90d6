//! Model — HarnessConfig and related enums.

use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Coldlaunch,
    Reboot,
    Restartb2g,
}

impl PhaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::Coldlaunch => "coldlaunch",
            PhaseKind::Reboot => "reboot",
            PhaseKind::Restartb2g => "restartb2g",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Markdown summary tables on stdout.
    Console,
    /// Machine-readable statistics on stdout.
    Json,
    /// No summary output; fatal errors still reach stderr.
    Quiet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub phase: PhaseKind,
    /// Target app for launch tests, either a short name or a full origin.
    pub app: Option<String>,
    pub entry_point: Option<String>,
    pub runs: u32,
    pub timeout_ms: u64,
    pub retries: u32,
    pub homescreen: String,
    pub system: String,
    /// Settle time between platform readiness and the launch tap.
    pub launch_delay_ms: u64,
    /// Settle time before memory is sampled after a run's end mark.
    pub memory_delay_ms: u64,
    pub output: OutputMode,
    /// Newline-delimited JSON sink for every reported point.
    pub metrics_path: Option<PathBuf>,
    /// Raw device log tee.
    pub logcat_path: Option<PathBuf>,
    pub device_url: String,
    pub marionette_host: String,
    pub marionette_port: u16,
    /// Suite base time, epoch milliseconds. All run timestamps derive from
    /// this one value so a suite's points sort together.
    pub time: i64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            phase: PhaseKind::Coldlaunch,
            app: None,
            entry_point: None,
            runs: 1,
            timeout_ms: 60_000,
            retries: 1,
            homescreen: "homescreen.gaiamobile.org".to_string(),
            system: "system.gaiamobile.org".to_string(),
            launch_delay_ms: 10_000,
            memory_delay_ms: 0,
            output: OutputMode::Console,
            metrics_path: None,
            logcat_path: None,
            device_url: "http://localhost:9090".to_string(),
            marionette_host: "localhost".to_string(),
            marionette_port: 2828,
            time: Utc::now().timestamp_millis(),
        }
    }
}

impl HarnessConfig {
    /// Full origin of the target app. Short names are expanded the way the
    /// platform names its packaged apps.
    pub fn app_origin(&self) -> Option<String> {
        self.app.as_ref().map(|app| {
            if app.contains('.') {
                app.clone()
            } else {
                format!("{app}.gaiamobile.org")
            }
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.runs == 0 {
            return Err("runs must be > 0".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be > 0".to_string());
        }
        if self.phase == PhaseKind::Coldlaunch && self.app.is_none() {
            return Err("coldlaunch requires an app".to_string());
        }
        if self.homescreen.is_empty() || self.system.is_empty() {
            return Err("homescreen and system origins must not be empty".to_string());
        }
        Ok(())
    }
}

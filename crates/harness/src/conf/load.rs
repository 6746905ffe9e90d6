//! Load — config loading from file and environment variables.

use std::path::{Path, PathBuf};

use super::model::HarnessConfig;

impl HarnessConfig {
    /// Load configuration.
    /// Priority: CLI flags (applied by the caller) > Environment Variables
    /// > Config File > Defaults
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path =
            std::env::var("HARNESS_CONFIG_FILE").unwrap_or_else(|_| "harness.toml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", config_path);
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: HarnessConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Environment variables override file config
    fn apply_env(&mut self) {
        if let Some(runs) = env_parse("HARNESS_RUNS") {
            self.runs = runs;
        }
        if let Some(timeout) = env_parse("HARNESS_TIMEOUT") {
            self.timeout_ms = timeout;
        }
        if let Some(retries) = env_parse("HARNESS_RETRIES") {
            self.retries = retries;
        }
        if let Ok(url) = std::env::var("HARNESS_DEVICE_URL") {
            self.device_url = url;
        }
        if let Ok(host) = std::env::var("HARNESS_MARIONETTE_HOST") {
            self.marionette_host = host;
        }
        if let Some(port) = env_parse("HARNESS_MARIONETTE_PORT") {
            self.marionette_port = port;
        }
        if let Ok(path) = std::env::var("HARNESS_METRICS") {
            self.metrics_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("HARNESS_LOGCAT") {
            self.logcat_path = Some(PathBuf::from(path));
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}

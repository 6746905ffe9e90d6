//! Report sinks. Persistence is fire-and-forget from the phase's point of
//! view; a sink that cannot write logs and drops, it never fails a suite.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use super::point::TimeSeriesPoint;

#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn report(&self, points: &[TimeSeriesPoint]);
}

/// Newline-delimited JSON appender.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn append(&self, points: &[TimeSeriesPoint]) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut buffer = String::new();
        for point in points {
            match serde_json::to_string(point) {
                Ok(line) => {
                    buffer.push_str(&line);
                    buffer.push('\n');
                }
                Err(err) => warn!(error = %err, "unserializable point dropped"),
            }
        }

        file.write_all(buffer.as_bytes()).await?;
        file.flush().await
    }
}

#[async_trait]
impl ReportSink for FileSink {
    async fn report(&self, points: &[TimeSeriesPoint]) {
        if let Err(err) = self.append(points).await {
            warn!(path = %self.path.display(), error = %err, "metrics write failed");
        }
    }
}

#[cfg(test)]
pub struct VecSink {
    pub points: std::sync::Mutex<Vec<TimeSeriesPoint>>,
}

#[cfg(test)]
impl VecSink {
    pub fn new() -> Self {
        Self {
            points: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ReportSink for VecSink {
    async fn report(&self, points: &[TimeSeriesPoint]) {
        self.points.lock().unwrap().extend_from_slice(points);
    }
}

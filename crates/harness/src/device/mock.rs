//! In-memory device double for phase and dispatch tests. Control calls are
//! recorded, and scripted raw log lines are injected into the most recently
//! opened log stream so tests can model the device's side of a run.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::control::{BuildRevisions, DeviceControl, DeviceError, LineStream};

const SYSTEM_CONTEXT: &str = "system.gaiamobile.org";

#[derive(Default)]
pub struct MockDevice {
    pub calls: Mutex<Vec<String>>,
    /// uss/pss/rss reported by `write_memory_sample`, in MB.
    pub memory_mb: (f64, f64, f64),
    pub properties: HashMap<String, String>,
    pub revisions: BuildRevisions,
    /// Raw lines injected into the live stream after each `restart`.
    pub on_restart: Mutex<Vec<String>>,
    /// Raw lines injected into the live stream after each `hard_reboot`.
    pub on_reboot: Mutex<Vec<String>>,
    /// Per-tap line batches, consumed front to back.
    pub on_tap: Mutex<VecDeque<Vec<String>>>,

    live: Mutex<Option<mpsc::Sender<String>>>,
    queued: Mutex<Vec<String>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            memory_mb: (10.0, 20.0, 30.0),
            ..Self::default()
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Push a raw log line into the live stream, or queue it for the next
    /// stream if none is open yet.
    pub async fn inject_line(&self, line: impl Into<String>) {
        let line = line.into();
        let sender = self.live.lock().unwrap().clone();

        match sender {
            Some(sender) => {
                let _ = sender.send(line).await;
            }
            None => self.queued.lock().unwrap().push(line),
        }
    }

    async fn inject_all(&self, lines: Vec<String>) {
        for line in lines {
            self.inject_line(line).await;
        }
    }
}

#[async_trait]
impl DeviceControl for MockDevice {
    async fn restart(&self) -> Result<(), DeviceError> {
        self.record("restart");
        let lines = self.on_restart.lock().unwrap().clone();
        self.inject_all(lines).await;
        Ok(())
    }

    async fn hard_reboot(&self) -> Result<(), DeviceError> {
        self.record("hard_reboot");
        // A reboot kills the connection behind any open log stream.
        *self.live.lock().unwrap() = None;
        let lines = self.on_reboot.lock().unwrap().clone();
        self.inject_all(lines).await;
        Ok(())
    }

    async fn clear_log(&self) -> Result<(), DeviceError> {
        self.record("clear_log");
        Ok(())
    }

    async fn mark(&self, name: &str, epoch_ms: i64) -> Result<(), DeviceError> {
        self.record(format!("mark:{name}"));
        self.inject_line(format!(
            "I/PerformanceTiming(  100): {SYSTEM_CONTEXT}|mark|{name}|0|0|{epoch_ms}"
        ))
        .await;
        Ok(())
    }

    async fn write_memory_sample(&self, pid: u32, context: &str) -> Result<(), DeviceError> {
        self.record(format!("write_memory_sample:{pid}:{context}"));
        let (uss, pss, rss) = self.memory_mb;
        for (name, value) in [("uss", uss), ("pss", pss), ("rss", rss)] {
            self.inject_line(format!("I/PerformanceMemory(  100): {context}|{name}|{value}"))
                .await;
        }
        Ok(())
    }

    async fn kill_process(&self, pid: u32) -> Result<(), DeviceError> {
        self.record(format!("kill_process:{pid}"));
        Ok(())
    }

    async fn reset_input_state(&self) -> Result<(), DeviceError> {
        self.record("reset_input_state");
        Ok(())
    }

    async fn tap(&self, x: u32, y: u32) -> Result<(), DeviceError> {
        self.record(format!("tap:{x}:{y}"));
        let lines = self.on_tap.lock().unwrap().pop_front().unwrap_or_default();
        self.inject_all(lines).await;
        Ok(())
    }

    async fn forward_port(&self, remote_port: u16) -> Result<u16, DeviceError> {
        self.record(format!("forward_port:{remote_port}"));
        Ok(remote_port)
    }

    async fn build_revisions(&self) -> Result<BuildRevisions, DeviceError> {
        self.record("build_revisions");
        Ok(self.revisions.clone())
    }

    async fn properties(&self) -> Result<HashMap<String, String>, DeviceError> {
        self.record("properties");
        Ok(self.properties.clone())
    }

    async fn open_log_stream(&self, _sink: Option<PathBuf>) -> Result<LineStream, DeviceError> {
        self.record("open_log_stream");

        let (tx, rx) = mpsc::channel(64);
        let queued: Vec<String> = self.queued.lock().unwrap().drain(..).collect();
        for line in queued {
            let _ = tx.send(line).await;
        }
        *self.live.lock().unwrap() = Some(tx);

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

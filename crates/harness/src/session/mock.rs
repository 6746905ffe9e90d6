//! Recording double for the automation session.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::api::{AutomationSession, SessionError};

#[derive(Clone, Default)]
pub struct MockSession {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub icon: (u32, u32),
}

impl MockSession {
    pub fn new() -> Self {
        Self {
            calls: Arc::default(),
            icon: (64, 210),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl AutomationSession for MockSession {
    async fn start_session(&mut self) -> Result<(), SessionError> {
        self.record("start_session");
        Ok(())
    }

    async fn delete_session(&mut self) -> Result<(), SessionError> {
        self.record("delete_session");
        Ok(())
    }

    async fn trigger_memory_minimization(&mut self) -> Result<(), SessionError> {
        self.record("trigger_memory_minimization");
        Ok(())
    }

    async fn clear_performance_buffer(&mut self) -> Result<(), SessionError> {
        self.record("clear_performance_buffer");
        Ok(())
    }

    async fn icon_coordinates(
        &mut self,
        app: &str,
        entry_point: Option<&str>,
    ) -> Result<(u32, u32), SessionError> {
        match entry_point {
            Some(entry_point) => self.record(format!("icon_coordinates:{app}:{entry_point}")),
            None => self.record(format!("icon_coordinates:{app}")),
        }
        Ok(self.icon)
    }
}

//! Test-definition hooks. External callers attach setup, per-run, and
//! teardown callbacks explicitly when constructing the phase; per-run hooks
//! execute concurrently and all must succeed for the run to be reported.

use futures::future::BoxFuture;

use super::core::PhaseCore;

pub type Hook = Box<dyn for<'a> Fn(&'a PhaseCore) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync>;

#[derive(Default)]
pub struct TestHooks {
    pub setup: Option<Hook>,
    pub after_each: Vec<Hook>,
    pub teardown: Option<Hook>,
}

impl TestHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_setup(mut self, hook: Hook) -> Self {
        self.setup = Some(hook);
        self
    }

    pub fn after_each(mut self, hook: Hook) -> Self {
        self.after_each.push(hook);
        self
    }

    pub fn on_teardown(mut self, hook: Hook) -> Self {
        self.teardown = Some(hook);
        self
    }
}

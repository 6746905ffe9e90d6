//! Structured wait primitives over the dispatcher's entry fan-out.
//!
//! Each waiter holds its own broadcast receiver for exactly as long as the
//! call is pending, so the subscription ends on match, on error, and on
//! cancellation alike. Waiters never interfere with each other: every one
//! sees the full entry sequence and resolves on its own first match.

use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use super::dispatcher::Dispatcher;
use crate::error::HarnessError;
use crate::parser::{Entry, MemoryEntry, PerformanceEntry};

impl Dispatcher {
    /// Resolve the first performance entry with the given name from the
    /// given origin context.
    pub async fn wait_for_entry(
        &self,
        name: &str,
        context: &str,
    ) -> Result<PerformanceEntry, HarnessError> {
        let mut rx = self.subscribe();

        loop {
            match rx.recv().await {
                Ok(Entry::Performance(entry))
                    if entry.name == name && entry.context == context =>
                {
                    debug!(name, context, "matched awaited performance entry");
                    return Ok(entry);
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "entry waiter lagged behind dispatch");
                    continue;
                }
                Err(RecvError::Closed) => return Err(HarnessError::StreamClosed),
            }
        }
    }

    /// Resolve once all three of uss, pss, and rss have been observed for
    /// the given context, in any order. Resolves with the last of the three.
    pub async fn wait_for_memory(&self, context: &str) -> Result<MemoryEntry, HarnessError> {
        let mut rx = self.subscribe();
        let (mut has_uss, mut has_pss, mut has_rss) = (false, false, false);

        loop {
            match rx.recv().await {
                Ok(Entry::Memory(entry)) if entry.context == context => {
                    match entry.name.as_str() {
                        "uss" => has_uss = true,
                        "pss" => has_pss = true,
                        "rss" => has_rss = true,
                        _ => {}
                    }

                    if has_uss && has_pss && has_rss {
                        debug!(context, "all three memory samples observed");
                        return Ok(entry);
                    }
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "memory waiter lagged behind dispatch");
                    continue;
                }
                Err(RecvError::Closed) => return Err(HarnessError::StreamClosed),
            }
        }
    }
}

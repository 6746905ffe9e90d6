use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

use crate::parser::{classify, Entry, EntryParser, ParserRegistry};

// Capacity of the entry fan-out channel. A run captures at most a few
// hundred entries; waiters that fall behind by more than this see a Lagged
// error and simply keep receiving.
const CHANNEL_CAPACITY: usize = 1024;

/// Bridges a live, push-based line stream to the parser registry.
///
/// A reader task consumes the stream, classifies each line, matches it
/// against the registered parsers, and fans decoded entries out to all
/// subscribers. Stream arrival order is preserved as emission order.
pub struct Dispatcher {
    registry: Arc<RwLock<ParserRegistry>>,
    tx: Option<broadcast::Sender<Entry>>,
    reader: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Attach to a line stream and begin dispatching immediately.
    pub fn new<S>(lines: S, registry: ParserRegistry) -> Self
    where
        S: Stream<Item = String> + Send + 'static,
    {
        let registry = Arc::new(RwLock::new(registry));
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);

        let reader = tokio::spawn({
            let registry = Arc::clone(&registry);
            let tx = tx.clone();

            async move {
                tokio::pin!(lines);

                while let Some(raw) = lines.next().await {
                    let Some(line) = classify(&raw) else {
                        continue;
                    };

                    let entry = registry.read().await.dispatch(&line);

                    if let Some(entry) = entry {
                        // No subscribers is fine; entries are only
                        // meaningful while someone is waiting or capturing.
                        let _ = tx.send(entry);
                    }
                }

                debug!("log line stream ended");
            }
        });

        Self {
            registry,
            tx: Some(tx),
            reader: Some(reader),
        }
    }

    /// Append a parser to the registry. Order of registration is order of
    /// matching.
    pub async fn register(&self, parser: Box<dyn EntryParser>) {
        self.registry.write().await.register(parser);
    }

    /// Hand out an independent entry receiver. Arbitrarily many concurrent
    /// subscribers are supported; each sees every entry dispatched after it
    /// subscribed. After `end` the receiver is already closed.
    pub fn subscribe(&self) -> broadcast::Receiver<Entry> {
        match &self.tx {
            Some(tx) => tx.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    /// Detach from the underlying stream and release every subscriber.
    /// Dropping the stream closes the device connection behind it; dropping
    /// the sender resolves pending waiters with `Closed`. Idempotent.
    pub fn end(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.tx = None;
    }

    pub fn is_ended(&self) -> bool {
        self.reader.is_none()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.end();
    }
}

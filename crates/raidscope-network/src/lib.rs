//! In-process change notification for presentation layers.

use std::sync::{Arc, Mutex};

use futures::{stream::BoxStream, StreamExt};
use raidscope_types::events::TrackerEvent;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{trace, warn};

/// Publishing never blocks; slow subscribers may miss events.
pub trait ChangeNotifier: Send + Sync {
    fn publish(&self, event: TrackerEvent);
    fn subscribe(&self) -> BoxStream<'static, TrackerEvent>;
}

/// Broadcast-channel bus for async subscribers.
#[derive(Clone)]
pub struct LocalBus {
    tx: broadcast::Sender<TrackerEvent>,
}

impl LocalBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ChangeNotifier for LocalBus {
    fn publish(&self, event: TrackerEvent) {
        trace!(kind = ?event.kind, "publishing tracker event");
        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }

    fn subscribe(&self) -> BoxStream<'static, TrackerEvent> {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|event| async move { event.ok() })
            .boxed()
    }
}

pub type Listener = Box<dyn Fn(&TrackerEvent) + Send + Sync>;

/// Synchronous callbacks invoked in registration order.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_change<F>(&self, listener: F)
    where
        F: Fn(&TrackerEvent) + Send + Sync + 'static,
    {
        match self.listeners.lock() {
            Ok(mut listeners) => listeners.push(Box::new(listener)),
            Err(_) => warn!("listener registry poisoned; dropping listener"),
        }
    }

    pub fn notify(&self, event: &TrackerEvent) {
        match self.listeners.lock() {
            Ok(listeners) => listeners.iter().for_each(|listener| listener(event)),
            Err(_) => warn!("listener registry poisoned; skipping notification"),
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

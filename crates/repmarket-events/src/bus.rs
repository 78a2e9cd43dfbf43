//! Event bus with ordered, isolated handler delivery.

use crate::error::EventError;
use crate::event::{EventKind, ShellEvent};
use parking_lot::RwLock;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Capacity of the broadcast channel used by async listeners.
const BROADCAST_CAPACITY: usize = 256;

/// Identifier returned by [`EventBus::on`]; pass it to [`EventBus::off`].
pub type SubscriptionId = u64;

/// A synchronous event handler.
pub type Handler = Arc<dyn Fn(&ShellEvent) -> anyhow::Result<()> + Send + Sync>;

struct Subscriber {
    id: SubscriptionId,
    /// `None` receives every event.
    kind: Option<EventKind>,
    handler: Handler,
}

/// Publish/subscribe bus for [`ShellEvent`]s.
pub struct EventBus {
    /// Subscribers in subscription order.
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
    /// Broadcast channel for async listeners.
    event_tx: broadcast::Sender<ShellEvent>,
    stats: RwLock<BusStats>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
            event_tx,
            stats: RwLock::new(BusStats::default()),
        }
    }

    /// Subscribe `handler` to events of `kind`.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&ShellEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(Some(kind), Arc::new(handler))
    }

    /// Subscribe `handler` to every event.
    pub fn on_any<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ShellEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(None, Arc::new(handler))
    }

    fn subscribe(&self, kind: Option<EventKind>, handler: Handler) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.subscribers.write().push(Subscriber { id, kind, handler });
        debug!(subscription = id, kind = ?kind, "Handler subscribed");
        id
    }

    /// Remove a subscription. Returns false if it was not registered.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        let removed = subscribers.len() != before;
        if removed {
            debug!(subscription = id, "Handler unsubscribed");
        }
        removed
    }

    /// Deliver `event` to every matching handler, in subscription order.
    pub fn emit(&self, event: ShellEvent) -> DeliveryReport {
        let kind = event.kind();

        // Snapshot so handlers can touch the bus without deadlocking.
        let targets: Vec<(SubscriptionId, Handler)> = self
            .subscribers
            .read()
            .iter()
            .filter(|s| s.kind.map_or(true, |k| k == kind))
            .map(|s| (s.id, s.handler.clone()))
            .collect();

        let mut report = DeliveryReport::default();
        for (id, handler) in targets {
            match catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    warn!(subscription = id, event = %kind, error = %e, "Event handler failed");
                    report.failures.push(EventError::HandlerFailed {
                        subscription: id,
                        kind,
                        message: e.to_string(),
                    });
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(subscription = id, event = %kind, panic = %message, "Event handler panicked");
                    report.failures.push(EventError::HandlerPanicked {
                        subscription: id,
                        kind,
                        message,
                    });
                }
            }
        }

        // No receivers is not an error.
        let _ = self.event_tx.send(event);

        {
            let mut stats = self.stats.write();
            stats.total_events += 1;
            stats.handler_failures += report.failures.len() as u64;
        }

        debug!(
            event = %kind,
            delivered = report.delivered,
            failed = report.failures.len(),
            "Event emitted"
        );

        report
    }

    /// Receive every emitted event asynchronously.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ShellEvent> {
        self.event_tx.subscribe()
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Bus statistics.
    pub fn stats(&self) -> BusStats {
        let mut stats = self.stats.read().clone();
        stats.handlers = self.handler_count();
        stats
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handler_count())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Outcome of a single [`EventBus::emit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Handlers that completed successfully.
    pub delivered: usize,
    /// Handlers that failed or panicked.
    pub failures: Vec<EventError>,
}

/// Bus statistics.
#[derive(Debug, Clone, Default)]
pub struct BusStats {
    /// Currently registered handlers.
    pub handlers: usize,
    /// Total events emitted since creation.
    pub total_events: u64,
    /// Total handler failures isolated since creation.
    pub handler_failures: u64,
}

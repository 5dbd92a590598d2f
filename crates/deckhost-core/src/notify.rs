// ── Device event fan-out ──
//
// Synchronous, order-preserving dispatch of connect/disconnect events to
// registered handlers, plus a broadcast channel for async consumers. A
// failing or panicking handler never stops the rest of the fan-out.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::model::DeviceIdentity;

const EVENT_CHANNEL_SIZE: usize = 256;

// ── Events ───────────────────────────────────────────────────────────

/// A device came online or went offline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Connected(Arc<DeviceIdentity>),
    Disconnected(Arc<DeviceIdentity>),
}

impl DeviceEvent {
    pub fn identity(&self) -> &Arc<DeviceIdentity> {
        match self {
            Self::Connected(identity) | Self::Disconnected(identity) => identity,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::Disconnected(_) => "disconnected",
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Error a handler reports back to the notifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Subscriber to device events.
///
/// Called on the notifying thread; long-running work belongs on the
/// handler's own task.
pub trait DeviceEventHandler: Send + Sync {
    fn handle(&self, event: &DeviceEvent) -> Result<(), HandlerError>;
}

impl<F> DeviceEventHandler for F
where
    F: Fn(&DeviceEvent) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, event: &DeviceEvent) -> Result<(), HandlerError> {
        self(event)
    }
}

/// Handle returned by [`EventNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    name: String,
    handler: Arc<dyn DeviceEventHandler>,
}

// ── Report ───────────────────────────────────────────────────────────

/// One handler that failed during a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberFailure {
    pub subscription: SubscriptionId,
    pub name: String,
    pub reason: String,
}

/// Outcome of a single fan-out: every handler ran, some may have failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub delivered: usize,
    pub failures: Vec<SubscriberFailure>,
}

impl NotifyReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// ── Notifier ─────────────────────────────────────────────────────────

/// Observer list for device connect/disconnect notifications.
pub struct EventNotifier {
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
    event_tx: broadcast::Sender<DeviceEvent>,
}

impl EventNotifier {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            event_tx,
        }
    }

    /// Register a handler. Handlers run in subscription order.
    pub fn subscribe(
        &self,
        name: impl Into<String>,
        handler: impl DeviceEventHandler + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let name = name.into();
        debug!(subscription = %id, name = %name, "event subscriber added");
        self.subscribers.write().push(Subscriber {
            id,
            name,
            handler: Arc::new(handler),
        });
        id
    }

    /// Remove a handler. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        before != subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Subscribe to the event broadcast stream.
    pub fn events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.event_tx.subscribe()
    }

    pub fn notify_connected(&self, identity: Arc<DeviceIdentity>) -> NotifyReport {
        self.notify(&DeviceEvent::Connected(identity))
    }

    pub fn notify_disconnected(&self, identity: Arc<DeviceIdentity>) -> NotifyReport {
        self.notify(&DeviceEvent::Disconnected(identity))
    }

    /// Deliver `event` to every current handler, then to the broadcast channel.
    pub fn notify(&self, event: &DeviceEvent) -> NotifyReport {
        // Snapshot so handlers may (un)subscribe without deadlocking.
        let subscribers = self.subscribers.read().clone();
        let mut report = NotifyReport::default();

        for subscriber in &subscribers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| subscriber.handler.handle(event)));
            let reason = match outcome {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(payload) => panic_message(payload.as_ref()),
            };
            warn!(
                subscription = %subscriber.id,
                name = %subscriber.name,
                event = event.kind(),
                device_id = %event.identity().device_id,
                %reason,
                "event subscriber failed"
            );
            report.failures.push(SubscriberFailure {
                subscription: subscriber.id,
                name: subscriber.name.clone(),
                reason,
            });
        }

        // No receivers is fine; async consumers are optional.
        let _ = self.event_tx.send(event.clone());

        debug!(
            event = event.kind(),
            device_id = %event.identity().device_id,
            delivered = report.delivered,
            failed = report.failures.len(),
            "device event dispatched"
        );
        report
    }
}

impl Default for EventNotifier {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".into()
    }
}

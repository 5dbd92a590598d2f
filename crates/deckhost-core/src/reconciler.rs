// ── Session reconciler ──
//
// Turns the network layer's two raw events (session established, session
// closed) into registry mutations plus notifications. Notifications are
// always issued after the registry lock has been released.

use std::sync::Arc;

use tracing::debug;

use crate::model::{ConnectionState, DeviceIdentity};
use crate::notify::{EventNotifier, NotifyReport};
use crate::registry::{BindOutcome, ConnectionRegistry};

/// What happened to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    /// Unbound -> Bound; a `Connected` event was emitted.
    Bound,
    /// Session was already bound; nothing emitted.
    AlreadyBound,
    /// Device already held by another session and duplicates are rejected.
    Rejected,
    /// Bound -> Unbound; a `Disconnected` event was emitted.
    Unbound,
    /// Close of a session that was never bound; nothing emitted.
    NotBound,
}

/// Result of a reconciler call: the transition, and the fan-out report when
/// an event was emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub transition: SessionTransition,
    pub report: Option<NotifyReport>,
}

impl Reconciled {
    fn quiet(transition: SessionTransition) -> Self {
        Self {
            transition,
            report: None,
        }
    }
}

/// Orchestrates registry + notifier for the network layer.
#[derive(Clone)]
pub struct SessionReconciler {
    registry: Arc<ConnectionRegistry>,
    notifier: Arc<EventNotifier>,
}

impl SessionReconciler {
    pub fn new(registry: Arc<ConnectionRegistry>, notifier: Arc<EventNotifier>) -> Self {
        Self { registry, notifier }
    }

    /// Bind the session; emit `Connected` only if a new mapping was inserted.
    pub fn on_session_established(
        &self,
        session: &ConnectionState,
        identity: Arc<DeviceIdentity>,
    ) -> Reconciled {
        let outcome = self.registry.bind(session.session_id, Arc::clone(&identity));
        self.announce_bind(outcome, identity)
    }

    /// Emit whatever a finished `bind` calls for. Callers that bind under
    /// their own lock use this once that lock is released.
    pub(crate) fn announce_bind(
        &self,
        outcome: BindOutcome,
        identity: Arc<DeviceIdentity>,
    ) -> Reconciled {
        match outcome {
            BindOutcome::Bound => Reconciled {
                transition: SessionTransition::Bound,
                report: Some(self.notifier.notify_connected(identity)),
            },
            BindOutcome::AlreadyBound => Reconciled::quiet(SessionTransition::AlreadyBound),
            BindOutcome::DeviceAlreadyOnline { .. } => {
                Reconciled::quiet(SessionTransition::Rejected)
            }
        }
    }

    /// Unbind the session; emit `Disconnected` for the identity it held.
    pub fn on_session_closed(&self, session: &ConnectionState) -> Reconciled {
        // `unbind` hands back the identity under the same lock that removes
        // the mapping, so lookup and removal cannot be split by another writer.
        match self.registry.unbind(&session.session_id) {
            Some(identity) => Reconciled {
                transition: SessionTransition::Unbound,
                report: Some(self.notifier.notify_disconnected(identity)),
            },
            None => {
                debug!(session_id = %session.session_id, "closed session was never bound");
                Reconciled::quiet(SessionTransition::NotBound)
            }
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn notifier(&self) -> &Arc<EventNotifier> {
        &self.notifier
    }
}

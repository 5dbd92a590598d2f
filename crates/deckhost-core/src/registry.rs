// ── Connection registry ──
//
// Process-wide map from live sessions to the device identities they speak
// for. A single RwLock guards the map so no reader ever sees a partial
// update; every mutation republishes a snapshot through a `watch` channel.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::DuplicateSessionPolicy;
use crate::model::{Binding, DeviceId, DeviceIdentity, SessionId};
use crate::stream::BindingStream;

/// Result of [`ConnectionRegistry::bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// A new binding was inserted.
    Bound,
    /// The session was already bound; the first binding stands.
    AlreadyBound,
    /// Refused under [`DuplicateSessionPolicy::Reject`]: `holder` already
    /// speaks for this device.
    DeviceAlreadyOnline { holder: SessionId },
}

impl BindOutcome {
    /// Whether this call actually inserted a mapping.
    pub fn inserted(&self) -> bool {
        matches!(self, Self::Bound)
    }
}

/// Session -> device bindings with online/connected queries.
pub struct ConnectionRegistry {
    policy: DuplicateSessionPolicy,
    /// Bind order is iteration order, which makes reverse lookup deterministic.
    bindings: RwLock<IndexMap<SessionId, Binding>>,
    snapshot: watch::Sender<Arc<Vec<Binding>>>,
}

impl ConnectionRegistry {
    pub fn new(policy: DuplicateSessionPolicy) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            policy,
            bindings: RwLock::new(IndexMap::new()),
            snapshot,
        }
    }

    pub fn policy(&self) -> DuplicateSessionPolicy {
        self.policy
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Bind `session_id` to `identity`. First binder wins: binding an
    /// already-bound session is a no-op.
    pub fn bind(&self, session_id: SessionId, identity: Arc<DeviceIdentity>) -> BindOutcome {
        let mut bindings = self.bindings.write();

        if bindings.contains_key(&session_id) {
            debug!(session_id = %session_id, "session already bound; keeping first binding");
            return BindOutcome::AlreadyBound;
        }

        if self.policy == DuplicateSessionPolicy::Reject {
            if let Some(holder) = bindings
                .values()
                .find(|b| b.identity.device_id == identity.device_id)
            {
                warn!(
                    session_id = %session_id,
                    holder = %holder.session_id,
                    device_id = %identity.device_id,
                    "device already online; rejecting second session"
                );
                return BindOutcome::DeviceAlreadyOnline {
                    holder: holder.session_id,
                };
            }
        }

        info!(
            session_id = %session_id,
            device_id = %identity.device_id,
            name = %identity.display_name,
            "session bound"
        );
        bindings.insert(
            session_id,
            Binding {
                session_id,
                identity,
                bound_at: Utc::now(),
            },
        );
        self.publish(&bindings);
        BindOutcome::Bound
    }

    /// Remove the binding for `session_id`, returning the identity it held.
    /// Unknown sessions are tolerated.
    pub fn unbind(&self, session_id: &SessionId) -> Option<Arc<DeviceIdentity>> {
        let mut bindings = self.bindings.write();
        let removed = bindings.shift_remove(session_id)?;
        self.publish(&bindings);
        info!(
            session_id = %session_id,
            device_id = %removed.identity.device_id,
            "session unbound"
        );
        Some(removed.identity)
    }

    /// Remove every binding that references `device_id`.
    pub fn unbind_device(&self, device_id: &DeviceId) -> Vec<Binding> {
        let mut bindings = self.bindings.write();
        let mut removed = Vec::new();
        bindings.retain(|_, b| {
            if b.identity.device_id == *device_id {
                removed.push(b.clone());
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            self.publish(&bindings);
            info!(device_id = %device_id, sessions = removed.len(), "device unbound");
        }
        removed
    }

    /// Point every session bound to `identity.device_id` at `identity`.
    /// Returns how many bindings changed.
    pub fn refresh_identity(&self, identity: &Arc<DeviceIdentity>) -> usize {
        let mut bindings = self.bindings.write();
        let mut refreshed = 0;
        for binding in bindings.values_mut() {
            if binding.identity.device_id == identity.device_id
                && !Arc::ptr_eq(&binding.identity, identity)
            {
                binding.identity = Arc::clone(identity);
                refreshed += 1;
            }
        }
        if refreshed > 0 {
            self.publish(&bindings);
            debug!(device_id = %identity.device_id, refreshed, "bindings re-pointed");
        }
        refreshed
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn lookup_identity(&self, session_id: &SessionId) -> Option<Arc<DeviceIdentity>> {
        self.bindings
            .read()
            .get(session_id)
            .map(|b| Arc::clone(&b.identity))
    }

    /// Reverse lookup: the earliest-bound session for `device_id`.
    pub fn lookup_session(&self, device_id: &DeviceId) -> Option<SessionId> {
        self.bindings
            .read()
            .values()
            .find(|b| b.identity.device_id == *device_id)
            .map(|b| b.session_id)
    }

    /// Every session bound to `device_id`, in bind order.
    pub fn sessions_for(&self, device_id: &DeviceId) -> Vec<SessionId> {
        self.bindings
            .read()
            .values()
            .filter(|b| b.identity.device_id == *device_id)
            .map(|b| b.session_id)
            .collect()
    }

    /// True iff at least one bound session references `device_id`.
    pub fn is_online(&self, device_id: &DeviceId) -> bool {
        self.bindings
            .read()
            .values()
            .any(|b| b.identity.device_id == *device_id)
    }

    pub fn is_session_bound(&self, session_id: &SessionId) -> bool {
        self.bindings.read().contains_key(session_id)
    }

    pub fn active_session_ids(&self) -> HashSet<SessionId> {
        self.bindings.read().keys().copied().collect()
    }

    /// Distinct online devices, in order of their earliest binding.
    pub fn online_devices(&self) -> Vec<Arc<DeviceIdentity>> {
        let bindings = self.bindings.read();
        let mut seen = HashSet::new();
        bindings
            .values()
            .filter(|b| seen.insert(b.identity.device_id))
            .map(|b| Arc::clone(&b.identity))
            .collect()
    }

    /// Current bindings (cheap `Arc` clone of the last published snapshot).
    pub fn bindings(&self) -> Arc<Vec<Binding>> {
        self.snapshot.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe(&self) -> BindingStream {
        BindingStream::new(self.snapshot.subscribe())
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Called with the write lock held so snapshots are published in
    /// mutation order.
    fn publish(&self, bindings: &IndexMap<SessionId, Binding>) {
        let values: Vec<Binding> = bindings.values().cloned().collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(DuplicateSessionPolicy::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::thread;

    use pretty_assertions::assert_eq;

    use super::*;

    fn device(name: &str) -> Arc<DeviceIdentity> {
        Arc::new(DeviceIdentity::new(
            DeviceId::generate(),
            name,
            format!("/decks/{name}"),
        ))
    }

    #[test]
    fn first_bind_wins() {
        let registry = ConnectionRegistry::default();
        let session = SessionId::new();
        let first = device("first");
        let second = device("second");

        assert_eq!(registry.bind(session, Arc::clone(&first)), BindOutcome::Bound);
        assert_eq!(
            registry.bind(session, Arc::clone(&second)),
            BindOutcome::AlreadyBound
        );

        assert_eq!(registry.lookup_identity(&session), Some(first));
        assert!(!registry.is_online(&second.device_id));
    }

    #[test]
    fn unbind_of_unknown_session_is_tolerated() {
        let registry = ConnectionRegistry::default();
        let bound = SessionId::new();
        registry.bind(bound, device("desk"));

        assert!(registry.unbind(&SessionId::new()).is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.is_session_bound(&bound));
    }

    #[test]
    fn online_tracks_last_binding() {
        let registry = ConnectionRegistry::default();
        let desk = device("desk");
        let s1 = SessionId::new();
        let s2 = SessionId::new();

        registry.bind(s1, Arc::clone(&desk));
        registry.bind(s2, Arc::clone(&desk));
        assert!(registry.is_online(&desk.device_id));

        registry.unbind(&s1);
        assert!(registry.is_online(&desk.device_id));

        assert_eq!(registry.unbind(&s2), Some(Arc::clone(&desk)));
        assert!(!registry.is_online(&desk.device_id));
    }

    #[test]
    fn reverse_lookup_returns_earliest_session() {
        let registry = ConnectionRegistry::default();
        let desk = device("desk");
        let s1 = SessionId::new();
        let s2 = SessionId::new();
        registry.bind(s1, Arc::clone(&desk));
        registry.bind(s2, Arc::clone(&desk));

        assert_eq!(registry.lookup_session(&desk.device_id), Some(s1));
        assert_eq!(registry.sessions_for(&desk.device_id), vec![s1, s2]);
        assert_eq!(registry.online_devices(), vec![desk]);
        assert_eq!(registry.lookup_session(&DeviceId::generate()), None);
    }

    #[test]
    fn reject_policy_refuses_second_session_for_device() {
        let registry = ConnectionRegistry::new(DuplicateSessionPolicy::Reject);
        let desk = device("desk");
        let s1 = SessionId::new();
        let s2 = SessionId::new();

        assert!(registry.bind(s1, Arc::clone(&desk)).inserted());
        assert_eq!(
            registry.bind(s2, Arc::clone(&desk)),
            BindOutcome::DeviceAlreadyOnline { holder: s1 }
        );
        assert!(!registry.is_session_bound(&s2));

        registry.unbind(&s1);
        assert!(registry.bind(s2, desk).inserted());
    }

    #[test]
    fn active_session_ids_lists_all_bindings() {
        let registry = ConnectionRegistry::default();
        let s1 = SessionId::new();
        let s2 = SessionId::new();
        registry.bind(s1, device("a"));
        registry.bind(s2, device("b"));

        assert_eq!(registry.active_session_ids(), HashSet::from([s1, s2]));
    }

    #[test]
    fn unbind_device_drops_all_its_sessions() {
        let registry = ConnectionRegistry::default();
        let desk = device("desk");
        let other = device("other");
        let s1 = SessionId::new();
        let s2 = SessionId::new();
        let s3 = SessionId::new();
        registry.bind(s1, Arc::clone(&desk));
        registry.bind(s2, Arc::clone(&other));
        registry.bind(s3, Arc::clone(&desk));

        let removed: Vec<_> = registry
            .unbind_device(&desk.device_id)
            .into_iter()
            .map(|b| b.session_id)
            .collect();

        assert_eq!(removed, vec![s1, s3]);
        assert_eq!(registry.active_session_ids(), HashSet::from([s2]));
    }

    #[test]
    fn refresh_identity_repoints_only_that_device() {
        let registry = ConnectionRegistry::default();
        let desk = device("desk");
        let other = device("other");
        let s1 = SessionId::new();
        let s2 = SessionId::new();
        let s3 = SessionId::new();
        registry.bind(s1, Arc::clone(&desk));
        registry.bind(s2, Arc::clone(&other));
        registry.bind(s3, Arc::clone(&desk));

        let renamed = Arc::new(DeviceIdentity::new(desk.device_id, "Studio", "/decks/studio"));
        assert_eq!(registry.refresh_identity(&renamed), 2);
        assert_eq!(registry.refresh_identity(&renamed), 0);

        assert!(Arc::ptr_eq(&registry.lookup_identity(&s1).unwrap(), &renamed));
        assert!(Arc::ptr_eq(&registry.lookup_identity(&s3).unwrap(), &renamed));
        assert!(Arc::ptr_eq(&registry.lookup_identity(&s2).unwrap(), &other));
        let names: Vec<_> = registry
            .bindings()
            .iter()
            .map(|b| b.identity.display_name.clone())
            .collect();
        assert_eq!(names, vec!["Studio", "other", "Studio"]);
    }

    #[test]
    fn snapshot_follows_mutations() {
        let registry = ConnectionRegistry::default();
        assert!(registry.bindings().is_empty());

        let s1 = SessionId::new();
        registry.bind(s1, device("desk"));
        assert_eq!(registry.bindings().len(), 1);
        assert_eq!(registry.bindings()[0].session_id, s1);

        registry.unbind(&s1);
        assert!(registry.bindings().is_empty());
    }

    #[test]
    fn concurrent_binds_and_unbinds_stay_consistent() {
        let registry = Arc::new(ConnectionRegistry::default());
        let desk = device("desk");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let desk = Arc::clone(&desk);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let session = SessionId::new();
                        assert!(registry.bind(session, Arc::clone(&desk)).inserted());
                        assert!(registry.is_online(&desk.device_id));
                        assert!(registry.unbind(&session).is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(registry.is_empty());
        assert!(!registry.is_online(&desk.device_id));
        assert!(registry.bindings().is_empty());
    }
}

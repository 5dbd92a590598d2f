// ── Deck host facade ──
//
// Owns the persistence store, registry, notifier and reconciler for one
// process. Built once at startup and passed by reference (or cheap clone)
// to the network layer, the action subsystem and the UI.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use crate::config::HostConfig;
use crate::error::CoreError;
use crate::model::{ConnectionState, DeviceId, DeviceIdentity, MetadataUpdate, SessionId};
use crate::notify::{DeviceEvent, EventNotifier, NotifyReport};
use crate::reconciler::{Reconciled, SessionReconciler};
use crate::registry::ConnectionRegistry;
use crate::store::{PersistenceStore, SaveOutcome};
use crate::stream::BindingStream;

/// Result of [`DeckHost::forget`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forgotten {
    /// The durable record that was dropped, if the device was known.
    pub record: Option<DeviceIdentity>,
    /// Sessions that were bound to the device and have been unbound.
    pub sessions: Vec<SessionId>,
    /// One `Disconnected` fan-out per closed session.
    pub reports: Vec<NotifyReport>,
}

impl Forgotten {
    pub fn is_noop(&self) -> bool {
        self.record.is_none() && self.sessions.is_empty()
    }
}

/// The session registry subsystem for one host process.
///
/// Cheaply cloneable via `Arc<HostInner>`.
#[derive(Clone)]
pub struct DeckHost {
    inner: Arc<HostInner>,
}

struct HostInner {
    config: HostConfig,
    store: PersistenceStore,
    reconciler: SessionReconciler,
}

impl DeckHost {
    /// Create a host without touching disk. The known set stays
    /// uninitialized until [`load`](PersistenceStore::load) or a persist.
    pub fn new(config: HostConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(config.duplicate_sessions));
        let store = PersistenceStore::attached(&config, Arc::clone(&registry));
        let notifier = Arc::new(EventNotifier::new());

        Self {
            inner: Arc::new(HostInner {
                config,
                store,
                reconciler: SessionReconciler::new(registry, notifier),
            }),
        }
    }

    /// Create a host and seed the known set from the durable record, before
    /// any session can arrive.
    pub fn init(config: HostConfig) -> Result<Self, CoreError> {
        let host = Self::new(config);
        let known = host.inner.store.load()?;
        info!(
            path = %host.inner.store.path().display(),
            devices = known.len(),
            "deck host initialized"
        );
        Ok(host)
    }

    pub fn config(&self) -> &HostConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &PersistenceStore {
        &self.inner.store
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.inner.reconciler.registry()
    }

    pub fn notifier(&self) -> &Arc<EventNotifier> {
        self.inner.reconciler.notifier()
    }

    pub fn reconciler(&self) -> &SessionReconciler {
        &self.inner.reconciler
    }

    // ── Network layer entry points ───────────────────────────────────

    /// Handshake completed: make the identity known, then bind the session
    /// to the stored record itself.
    ///
    /// Persist and bind happen under the store lock, so a concurrent
    /// [`forget`](Self::forget) or metadata edit lands wholly before or after
    /// them. `Connected` is emitted once that lock is released.
    pub fn device_connected(&self, session: &ConnectionState, identity: DeviceIdentity) -> Reconciled {
        let registry = self.registry();
        let (stored, outcome) = self.inner.store.persist_and(identity, |stored| {
            registry.bind(session.session_id, Arc::clone(stored))
        });
        self.inner.reconciler.announce_bind(outcome, stored)
    }

    /// Transport closed.
    pub fn device_disconnected(&self, session: &ConnectionState) -> Reconciled {
        self.inner.reconciler.on_session_closed(session)
    }

    // ── Action subsystem / UI queries ────────────────────────────────

    /// Which device a button event arriving on `session_id` belongs to.
    pub fn resolve_session(&self, session_id: &SessionId) -> Option<Arc<DeviceIdentity>> {
        self.registry().lookup_identity(session_id)
    }

    pub fn is_online(&self, device_id: &DeviceId) -> bool {
        self.registry().is_online(device_id)
    }

    pub fn events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.notifier().events()
    }

    pub fn subscribe_bindings(&self) -> BindingStream {
        self.registry().subscribe()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Rename or re-home a known device. Sessions bound to it resolve to the
    /// new metadata as soon as this returns.
    pub fn update_metadata(
        &self,
        device_id: &DeviceId,
        update: &MetadataUpdate,
    ) -> Result<Arc<DeviceIdentity>, CoreError> {
        self.inner.store.update_metadata(device_id, update)
    }

    /// Permanently forget a device: drop its record and close out every
    /// session bound to it, emitting `Disconnected` for each.
    ///
    /// Record removal and unbinding share the store lock with
    /// [`device_connected`](Self::device_connected), so a session connecting
    /// meanwhile is either closed out here or kept along with a fresh record.
    pub fn forget(&self, device_id: &DeviceId) -> Forgotten {
        let registry = self.registry();
        let (record, bindings) = self
            .inner
            .store
            .forget_and(device_id, || registry.unbind_device(device_id));

        let mut forgotten = Forgotten {
            record,
            ..Forgotten::default()
        };
        for binding in bindings {
            forgotten.sessions.push(binding.session_id);
            forgotten
                .reports
                .push(self.notifier().notify_disconnected(binding.identity));
        }
        forgotten
    }

    /// Flush the known set to the durable record.
    pub fn save(&self) -> Result<SaveOutcome, CoreError> {
        self.inner.store.save()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn host_in(dir: &std::path::Path) -> DeckHost {
        DeckHost::init(HostConfig::new(dir.join("devices.toml"))).unwrap()
    }

    #[test]
    fn connected_device_uses_stored_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let host = host_in(dir.path());
        let id = DeviceId::generate();
        host.store()
            .persist(DeviceIdentity::new(id, "Studio", "/decks/studio"));

        let session = ConnectionState::accept(None);
        host.device_connected(&session, DeviceIdentity::new(id, "Deck-1234", "/tmp/default"));

        let resolved = host.resolve_session(&session.session_id).unwrap();
        assert_eq!(resolved.display_name, "Studio");
        assert_eq!(host.store().len(), 1);
    }

    #[test]
    fn forget_unbinds_and_drops_record() {
        let dir = tempfile::tempdir().unwrap();
        let host = host_in(dir.path());
        let identity = DeviceIdentity::new(DeviceId::generate(), "desk", "/decks/desk");
        let s1 = ConnectionState::accept(None);
        let s2 = ConnectionState::accept(None);
        host.device_connected(&s1, identity.clone());
        host.device_connected(&s2, identity.clone());

        let forgotten = host.forget(&identity.device_id);

        assert_eq!(forgotten.record, Some(identity.clone()));
        assert_eq!(forgotten.sessions, vec![s1.session_id, s2.session_id]);
        assert_eq!(forgotten.reports.len(), 2);
        assert!(!host.is_online(&identity.device_id));
        assert!(!host.store().is_persisted(&identity.device_id));
        assert!(host.forget(&identity.device_id).is_noop());
    }

    #[test]
    fn rename_reaches_bound_session() {
        let dir = tempfile::tempdir().unwrap();
        let host = host_in(dir.path());
        let id = DeviceId::generate();
        let session = ConnectionState::accept(None);
        host.device_connected(&session, DeviceIdentity::new(id, "Desk", "/decks/desk"));
        let mut bindings = host.subscribe_bindings();

        host.update_metadata(
            &id,
            &MetadataUpdate {
                display_name: Some("Studio".into()),
                main_folder: Some("/decks/studio".into()),
            },
        )
        .unwrap();

        let resolved = host.resolve_session(&session.session_id).unwrap();
        assert_eq!(resolved.display_name, "Studio");
        assert_eq!(resolved.main_folder(), std::path::Path::new("/decks/studio"));
        assert_eq!(bindings.latest()[0].identity.display_name, "Studio");

        // Editing through the store directly reaches the session too.
        host.store()
            .update_metadata(
                &id,
                &MetadataUpdate {
                    display_name: Some("Booth".into()),
                    main_folder: None,
                },
            )
            .unwrap();
        assert_eq!(
            host.resolve_session(&session.session_id).unwrap().display_name,
            "Booth"
        );
    }

    #[test]
    fn sessions_share_the_stored_identity() {
        let dir = tempfile::tempdir().unwrap();
        let host = host_in(dir.path());
        let identity = DeviceIdentity::new(DeviceId::generate(), "desk", "/decks/desk");
        let s1 = ConnectionState::accept(None);
        let s2 = ConnectionState::accept(None);
        host.device_connected(&s1, identity.clone());
        host.device_connected(&s2, identity.clone());

        let first = host.resolve_session(&s1.session_id).unwrap();
        let second = host.resolve_session(&s2.session_id).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn forget_racing_connect_never_strands_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let host = host_in(dir.path());
        let identity = DeviceIdentity::new(DeviceId::generate(), "desk", "/decks/desk");
        let id = identity.device_id;

        let (bound, forgotten) = std::thread::scope(|scope| {
            let connector = scope.spawn(|| {
                let mut bound = Vec::new();
                for _ in 0..300 {
                    let session = ConnectionState::accept(None);
                    let reconciled = host.device_connected(&session, identity.clone());
                    assert_eq!(reconciled.transition, crate::SessionTransition::Bound);
                    bound.push(session.session_id);
                }
                bound
            });
            let forgetter = scope.spawn(|| {
                let mut forgotten = Vec::new();
                for _ in 0..300 {
                    forgotten.extend(host.forget(&id).sessions);
                }
                forgotten
            });
            (connector.join().unwrap(), forgetter.join().unwrap())
        });

        let still_bound: Vec<_> = bound
            .iter()
            .filter(|s| !forgotten.contains(s))
            .copied()
            .collect();
        assert_eq!(host.registry().sessions_for(&id), still_bound);
        assert_eq!(host.is_online(&id), host.store().is_persisted(&id));
    }

    #[test]
    fn init_fails_on_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("devices.toml"), "[[device]\n").unwrap();

        let result = DeckHost::init(HostConfig::new(dir.path().join("devices.toml")));

        assert!(matches!(result, Err(CoreError::CorruptRecord { .. })));
    }
}

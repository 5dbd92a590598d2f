// ── Persistence store ──
//
// The known set of device identities plus the durable record backing it.
// One store-level mutex serializes load/persist/save so a persist racing a
// save can never interleave with the file write. When attached to a
// registry, that mutex is always taken before the registry lock.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::record;
use crate::config::{HostConfig, MetadataPolicy, UninitializedSavePolicy};
use crate::error::CoreError;
use crate::model::{DeviceId, DeviceIdentity, MetadataUpdate};
use crate::registry::ConnectionRegistry;

type KnownSet = IndexMap<DeviceId, Arc<DeviceIdentity>>;

/// Result of [`PersistenceStore::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The known set was written in full.
    Written { devices: usize },
    /// The known set was never initialized, so the durable record was deleted.
    Removed { existed: bool },
    /// The known set was never initialized and the record was left alone.
    Skipped,
}

/// Durable `DeviceId -> DeviceIdentity` mapping that survives restarts.
///
/// The known set stays *uninitialized* until the first [`load`](Self::load),
/// [`persist`](Self::persist) or [`merge_from`](Self::merge_from). Records
/// keep insertion order; re-persisting a device moves it to the end.
///
/// Each record is held as an `Arc<DeviceIdentity>` that live sessions share.
/// A store [`attached`](Self::attached) to a registry re-points those
/// sessions whenever a record's metadata changes.
pub struct PersistenceStore {
    path: PathBuf,
    metadata_policy: MetadataPolicy,
    uninitialized_save: UninitializedSavePolicy,
    known: Mutex<Option<KnownSet>>,
    live: Option<Arc<ConnectionRegistry>>,
}

impl PersistenceStore {
    pub fn new(config: &HostConfig) -> Self {
        Self {
            path: config.devices_path.clone(),
            metadata_policy: config.metadata_policy,
            uninitialized_save: config.uninitialized_save,
            known: Mutex::new(None),
            live: None,
        }
    }

    /// A store whose metadata edits reach the sessions bound in `registry`.
    pub fn attached(config: &HostConfig, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            live: Some(registry),
            ..Self::new(config)
        }
    }

    /// Location of the durable record.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_initialized(&self) -> bool {
        self.known.lock().is_some()
    }

    // ── Load / merge ─────────────────────────────────────────────────

    /// Seed the known set from the durable record.
    ///
    /// A missing record is a first run and yields whatever is already known
    /// (empty on a fresh store). Records whose id is already in memory are
    /// ignored, so repeated loads never clobber runtime state. A corrupt
    /// record fails the call and leaves the known set as it was.
    pub fn load(&self) -> Result<Vec<DeviceIdentity>, CoreError> {
        let mut guard = self.known.lock();
        let records = record::read(&self.path)?;
        let known = guard.get_or_insert_with(IndexMap::new);

        match records {
            Some(records) => {
                let added = merge(known, records);
                info!(
                    path = %self.path.display(),
                    added,
                    known = known.len(),
                    "loaded device record"
                );
            }
            None => debug!(path = %self.path.display(), "no device record yet"),
        }

        Ok(known.values().map(|d| (**d).clone()).collect())
    }

    /// Merge another durable record into the known set, same rules as `load`.
    ///
    /// Unlike `load`, a missing file is an error. Returns how many devices
    /// were added.
    pub fn merge_from(&self, path: &Path) -> Result<usize, CoreError> {
        let mut guard = self.known.lock();
        let records = record::read(path)?.ok_or_else(|| CoreError::ReadFailed {
            path: path.to_path_buf(),
            source: ErrorKind::NotFound.into(),
        })?;
        let known = guard.get_or_insert_with(IndexMap::new);
        let added = merge(known, records);
        info!(path = %path.display(), added, "merged device record");
        Ok(added)
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Make `identity` part of the known set and return the stored record.
    ///
    /// When the device is already known the old record is dropped and
    /// re-inserted at the end. Under [`MetadataPolicy::KeepStored`] the
    /// previously stored `Arc` is kept as is, so every session of the device
    /// shares one identity. Under [`MetadataPolicy::PreferIncoming`] differing
    /// metadata replaces the record and is pushed to live sessions.
    pub fn persist(&self, identity: DeviceIdentity) -> Arc<DeviceIdentity> {
        self.persist_and(identity, |_| ()).0
    }

    /// [`persist`](Self::persist), then run `then` on the stored record
    /// before the store lock is released.
    pub(crate) fn persist_and<R>(
        &self,
        identity: DeviceIdentity,
        then: impl FnOnce(&Arc<DeviceIdentity>) -> R,
    ) -> (Arc<DeviceIdentity>, R) {
        let mut guard = self.known.lock();
        let known = guard.get_or_insert_with(IndexMap::new);

        let stored = match known.shift_remove(&identity.device_id) {
            Some(previous)
                if self.metadata_policy == MetadataPolicy::KeepStored || *previous == identity =>
            {
                debug!(device_id = %identity.device_id, "re-persisted known device");
                previous
            }
            Some(_) => {
                let incoming = Arc::new(identity);
                debug!(device_id = %incoming.device_id, "replaced stored metadata");
                self.refresh_live(&incoming);
                incoming
            }
            None => {
                debug!(device_id = %identity.device_id, "persisted new device");
                Arc::new(identity)
            }
        };

        known.insert(stored.device_id, Arc::clone(&stored));
        let result = then(&stored);
        (stored, result)
    }

    /// Edit the metadata of a known device.
    ///
    /// The record is replaced by a fresh `Arc`; sessions bound to the device
    /// in an attached registry are re-pointed at it before this returns.
    pub fn update_metadata(
        &self,
        device_id: &DeviceId,
        update: &MetadataUpdate,
    ) -> Result<Arc<DeviceIdentity>, CoreError> {
        let mut guard = self.known.lock();
        let slot = guard
            .as_mut()
            .and_then(|known| known.get_mut(device_id))
            .ok_or(CoreError::DeviceNotFound {
                device_id: *device_id,
            })?;

        let mut edited = (**slot).clone();
        update.apply(&mut edited);
        let updated = Arc::new(edited);
        *slot = Arc::clone(&updated);
        debug!(device_id = %device_id, "updated device metadata");

        self.refresh_live(&updated);
        Ok(updated)
    }

    /// Drop a device from the known set. Returns the removed record.
    pub fn forget(&self, device_id: &DeviceId) -> Option<DeviceIdentity> {
        self.forget_and(device_id, || ()).0
    }

    /// [`forget`](Self::forget), then run `then` before the store lock is
    /// released.
    pub(crate) fn forget_and<R>(
        &self,
        device_id: &DeviceId,
        then: impl FnOnce() -> R,
    ) -> (Option<DeviceIdentity>, R) {
        let mut guard = self.known.lock();
        let removed = guard
            .as_mut()
            .and_then(|known| known.shift_remove(device_id))
            .map(Arc::unwrap_or_clone);
        if removed.is_some() {
            info!(device_id = %device_id, "forgot device");
        }
        let result = then();
        (removed, result)
    }

    // ── Save ─────────────────────────────────────────────────────────

    /// Write the full known set to the durable record.
    ///
    /// On failure the in-memory known set is untouched and stays
    /// authoritative.
    pub fn save(&self) -> Result<SaveOutcome, CoreError> {
        let guard = self.known.lock();

        if let Some(known) = guard.as_ref() {
            record::write(&self.path, known.values().map(|d| &**d))?;
            info!(path = %self.path.display(), devices = known.len(), "saved device record");
            return Ok(SaveOutcome::Written {
                devices: known.len(),
            });
        }

        match self.uninitialized_save {
            UninitializedSavePolicy::Remove => {
                let existed = record::remove(&self.path)?;
                warn!(
                    path = %self.path.display(),
                    existed,
                    "known set never initialized; removed device record"
                );
                Ok(SaveOutcome::Removed { existed })
            }
            UninitializedSavePolicy::Skip => {
                debug!("known set never initialized; save skipped");
                Ok(SaveOutcome::Skipped)
            }
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn get(&self, device_id: &DeviceId) -> Option<DeviceIdentity> {
        self.known
            .lock()
            .as_ref()
            .and_then(|known| known.get(device_id))
            .map(|d| (**d).clone())
    }

    pub fn is_persisted(&self, device_id: &DeviceId) -> bool {
        self.known
            .lock()
            .as_ref()
            .is_some_and(|known| known.contains_key(device_id))
    }

    /// Snapshot of the known set in insertion order.
    pub fn known_devices(&self) -> Vec<DeviceIdentity> {
        self.known
            .lock()
            .as_ref()
            .map(|known| known.values().map(|d| (**d).clone()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.known.lock().as_ref().map_or(0, IndexMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Called with the store lock held.
    fn refresh_live(&self, identity: &Arc<DeviceIdentity>) {
        if let Some(registry) = &self.live {
            let sessions = registry.refresh_identity(identity);
            if sessions > 0 {
                info!(device_id = %identity.device_id, sessions, "refreshed live sessions");
            }
        }
    }
}

/// Add records whose id is not yet known. First occurrence wins.
fn merge(known: &mut KnownSet, records: Vec<DeviceIdentity>) -> usize {
    let mut added = 0;
    for identity in records {
        if !known.contains_key(&identity.device_id) {
            known.insert(identity.device_id, Arc::new(identity));
            added += 1;
        }
    }
    added
}

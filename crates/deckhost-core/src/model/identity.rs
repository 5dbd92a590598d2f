// ── Device identity ──

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ids::DeviceId;

/// One physical or logical deck device, as known across reconnects.
///
/// `device_id` is immutable. `display_name` and `main_folder` are display
/// metadata that only change through the persistence store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub device_id: DeviceId,
    pub display_name: String,
    /// Root of the device's button/action layout.
    pub main_folder: PathBuf,
}

impl DeviceIdentity {
    pub fn new(
        device_id: DeviceId,
        display_name: impl Into<String>,
        main_folder: impl Into<PathBuf>,
    ) -> Self {
        Self {
            device_id,
            display_name: display_name.into(),
            main_folder: main_folder.into(),
        }
    }

    pub fn main_folder(&self) -> &Path {
        &self.main_folder
    }
}

/// Partial metadata edit for a known device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataUpdate {
    pub display_name: Option<String>,
    pub main_folder: Option<PathBuf>,
}

impl MetadataUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.main_folder.is_none()
    }

    pub(crate) fn apply(&self, identity: &mut DeviceIdentity) {
        if let Some(ref name) = self.display_name {
            identity.display_name.clone_from(name);
        }
        if let Some(ref folder) = self.main_folder {
            identity.main_folder.clone_from(folder);
        }
    }
}

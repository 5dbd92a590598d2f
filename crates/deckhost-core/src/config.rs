// ── Runtime host configuration ──
//
// These types describe *how* the registry and store behave. They never
// touch disk: deckhost-config (or a test) builds a `HostConfig` and hands
// it in.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Default file name of the durable device record.
pub const DEVICES_FILE_NAME: &str = "devices.toml";

/// Which metadata wins when a known device is persisted again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MetadataPolicy {
    /// Stored `display_name`/`main_folder` overwrite the caller's copy.
    #[default]
    KeepStored,
    /// The caller's copy replaces the stored metadata.
    PreferIncoming,
}

/// What `save` does when the known set was never initialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum UninitializedSavePolicy {
    /// Delete the durable record so it cannot go stale.
    #[default]
    Remove,
    /// Leave the durable record untouched.
    Skip,
}

/// Whether a second session may bind to a device that is already online.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DuplicateSessionPolicy {
    /// Track every session; reverse lookup yields the earliest bound one.
    #[default]
    Allow,
    /// Refuse the bind while another session holds the device.
    Reject,
}

/// Configuration for one host process.
///
/// Built by the CLI (or any embedding application), passed to
/// [`DeckHost`](crate::DeckHost) -- core never reads config files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Location of the durable device record.
    pub devices_path: PathBuf,
    pub metadata_policy: MetadataPolicy,
    pub uninitialized_save: UninitializedSavePolicy,
    pub duplicate_sessions: DuplicateSessionPolicy,
}

impl HostConfig {
    pub fn new(devices_path: impl Into<PathBuf>) -> Self {
        Self {
            devices_path: devices_path.into(),
            ..Self::default()
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            devices_path: PathBuf::from(DEVICES_FILE_NAME),
            metadata_policy: MetadataPolicy::default(),
            uninitialized_save: UninitializedSavePolicy::default(),
            duplicate_sessions: DuplicateSessionPolicy::default(),
        }
    }
}

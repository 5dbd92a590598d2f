// ── Core error types ──
//
// Errors surfaced by deckhost-core to its immediate caller. Lookup misses
// are never errors here: they come back as `None`.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::DeviceId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Durable record ───────────────────────────────────────────────
    #[error("Device record at {} is corrupt: {source}", path.display())]
    CorruptRecord {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("Cannot read device record at {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write device record at {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot serialize device record: {0}")]
    Serialization(#[from] toml::ser::Error),

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {device_id}")]
    DeviceNotFound { device_id: DeviceId },

    #[error("Invalid device id '{value}': {reason}")]
    InvalidDeviceId { value: String, reason: String },
}

impl CoreError {
    /// Whether the durable record itself is unusable (as opposed to I/O trouble).
    pub fn is_corrupt_record(&self) -> bool {
        matches!(self, Self::CorruptRecord { .. })
    }
}

// ── Core identity types ──
//
// DeviceId names a deck device for its whole life; SessionId names one
// transport connection and dies with it. Both are UUIDs underneath but
// are never interchangeable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

// ── DeviceId ────────────────────────────────────────────────────────

/// Stable identifier assigned to a deck device at provisioning time.
///
/// Primary key of the durable record and the value a session is matched
/// against. Never changes once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(Uuid);

impl DeviceId {
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Provision a brand-new device id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeviceId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| CoreError::InvalidDeviceId {
                value: s.to_owned(),
                reason: e.to_string(),
            })
    }
}

impl From<Uuid> for DeviceId {
    fn from(u: Uuid) -> Self {
        Self(u)
    }
}

// ── SessionId ───────────────────────────────────────────────────────

/// Identifier of one live transport session. Minted per connection,
/// never reused, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Mint a fresh session id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn device_id_parses_hyphenated_uuid() {
        let id: DeviceId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn device_id_trims_whitespace() {
        let id: DeviceId = "  550e8400-e29b-41d4-a716-446655440000\n".parse().unwrap();
        assert_eq!(id.as_uuid().to_string(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn device_id_rejects_garbage() {
        let err = "not-a-device".parse::<DeviceId>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidDeviceId { ref value, .. } if value == "not-a-device"));
    }

    #[test]
    fn session_ids_are_never_reused() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
    }
}

// ── Session domain types ──

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::identity::DeviceIdentity;
use super::ids::SessionId;

/// One live transport session, created by the network layer on accept.
///
/// Has no meaning after the connection closes and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    pub session_id: SessionId,
    pub peer: Option<SocketAddr>,
    pub opened_at: DateTime<Utc>,
}

impl ConnectionState {
    /// A new session for a freshly accepted connection.
    pub fn accept(peer: Option<SocketAddr>) -> Self {
        Self {
            session_id: SessionId::new(),
            peer,
            opened_at: Utc::now(),
        }
    }
}

/// A registry row: which device an active session speaks for.
#[derive(Debug, Clone, Serialize)]
pub struct Binding {
    pub session_id: SessionId,
    pub identity: Arc<DeviceIdentity>,
    pub bound_at: DateTime<Utc>,
}

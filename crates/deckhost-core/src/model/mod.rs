// ── Domain model ──
//
// Durable device identities and the ephemeral sessions bound to them.

pub mod connection;
pub mod identity;
pub mod ids;

pub use connection::{Binding, ConnectionState};
pub use identity::{DeviceIdentity, MetadataUpdate};
pub use ids::{DeviceId, SessionId};

//! Device session registry and identity persistence for the ButtonDeck host.
//!
//! Deck devices connect over the network, hand over a stable device id
//! during the handshake, and may drop and reconnect at any time. This
//! crate reconciles those short-lived sessions with long-lived identities:
//!
//! - **[`PersistenceStore`]**: the known set of [`DeviceIdentity`] records
//!   and the `devices.toml` file behind it. Loads merge without clobbering
//!   runtime state; re-persisting a known device keeps its stored metadata
//!   (see [`MetadataPolicy`]).
//!
//! - **[`ConnectionRegistry`]**: `SessionId -> DeviceIdentity` bindings
//!   behind a single lock, answering "which device is this session?" and
//!   "is this device online?". Publishes snapshots as a [`BindingStream`].
//!
//! - **[`EventNotifier`]**: ordered, failure-isolated fan-out of
//!   [`DeviceEvent`]s to subscribers, mirrored onto a broadcast channel.
//!
//! - **[`SessionReconciler`]**: the two entry points the network layer
//!   calls: session established, session closed.
//!
//! - **[`DeckHost`]**: owns all of the above for one process.

pub mod config;
pub mod error;
pub mod host;
pub mod model;
pub mod notify;
pub mod reconciler;
pub mod registry;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    DEVICES_FILE_NAME, DuplicateSessionPolicy, HostConfig, MetadataPolicy, UninitializedSavePolicy,
};
pub use error::CoreError;
pub use host::{DeckHost, Forgotten};
pub use model::{Binding, ConnectionState, DeviceId, DeviceIdentity, MetadataUpdate, SessionId};
pub use notify::{
    DeviceEvent, DeviceEventHandler, EventNotifier, HandlerError, NotifyReport, SubscriberFailure,
    SubscriptionId,
};
pub use reconciler::{Reconciled, SessionReconciler, SessionTransition};
pub use registry::{BindOutcome, ConnectionRegistry};
pub use store::{PersistenceStore, SaveOutcome};
pub use stream::{BindingStream, BindingWatchStream};

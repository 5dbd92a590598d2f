// ── Device persistence ──
//
// Known set of device identities and the TOML record that backs it.

mod persistence;
mod record;

pub use persistence::{PersistenceStore, SaveOutcome};

//! End-to-end lifecycle of the registry subsystem: startup load, sessions
//! coming and going, persistence across a simulated restart.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use deckhost_core::{
    ConnectionState, DeckHost, DeviceEvent, DeviceId, DeviceIdentity, HandlerError, HostConfig,
    SaveOutcome, SessionTransition,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn record_events(host: &DeckHost) -> Arc<Mutex<Vec<(String, DeviceId)>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    host.notifier()
        .subscribe("test-log", move |e: &DeviceEvent| -> Result<(), HandlerError> {
            sink.lock().push((e.kind().to_owned(), e.identity().device_id));
            Ok(())
        });
    log
}

// ── Scenario ────────────────────────────────────────────────────────

#[test]
fn device_lifecycle_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = HostConfig::new(dir.path().join("devices.toml"));

    // Empty durable record: first run.
    let host = DeckHost::init(config.clone()).unwrap();
    assert!(host.store().known_devices().is_empty());
    let events = record_events(&host);

    let device_x = DeviceIdentity::new(DeviceId::generate(), "Deck X", "/decks/x");
    let session1 = ConnectionState::accept(Some("127.0.0.1:51234".parse().unwrap()));

    let up = host
        .reconciler()
        .on_session_established(&session1, Arc::new(device_x.clone()));
    assert_eq!(up.transition, SessionTransition::Bound);
    assert!(host.is_online(&device_x.device_id));

    let down = host.device_disconnected(&session1);
    assert_eq!(down.transition, SessionTransition::Unbound);
    assert!(!host.is_online(&device_x.device_id));

    assert_eq!(
        *events.lock(),
        vec![
            ("connected".to_owned(), device_x.device_id),
            ("disconnected".to_owned(), device_x.device_id),
        ]
    );

    host.store().persist(device_x.clone());
    assert_eq!(host.save().unwrap(), SaveOutcome::Written { devices: 1 });
    drop(host);

    // Restart.
    let restarted = DeckHost::init(config).unwrap();
    assert_eq!(restarted.store().known_devices(), vec![device_x]);
    assert!(restarted.registry().is_empty());
}

#[test]
fn reconnect_after_restart_keeps_persisted_name() {
    let dir = tempfile::tempdir().unwrap();
    let config = HostConfig::new(dir.path().join("devices.toml"));
    let id = DeviceId::generate();

    let host = DeckHost::init(config.clone()).unwrap();
    host.store()
        .persist(DeviceIdentity::new(id, "Streaming Deck", "/decks/stream"));
    host.save().unwrap();

    let restarted = DeckHost::init(config).unwrap();
    let session = ConnectionState::accept(None);
    // The device announces itself with its factory defaults.
    restarted.device_connected(&session, DeviceIdentity::new(id, "ButtonDeck", "/"));

    let resolved = restarted.resolve_session(&session.session_id).unwrap();
    assert_eq!(resolved.display_name, "Streaming Deck");
    assert_eq!(restarted.registry().lookup_session(&id), Some(session.session_id));
}

#[test]
fn merge_on_load_adds_only_new_devices() {
    let dir = tempfile::tempdir().unwrap();
    let config = HostConfig::new(dir.path().join("devices.toml"));
    let a_id = DeviceId::generate();
    let a_disk = DeviceIdentity::new(a_id, "A on disk", "/decks/a-disk");
    let b = DeviceIdentity::new(DeviceId::generate(), "B", "/decks/b");

    let writer = DeckHost::new(config.clone());
    writer.store().persist(a_disk);
    writer.store().persist(b.clone());
    writer.save().unwrap();

    let host = DeckHost::new(config);
    let a = DeviceIdentity::new(a_id, "A in memory", "/decks/a");
    host.store().persist(a.clone());

    assert_eq!(host.store().load().unwrap(), vec![a, b]);
}

// ── Concurrency ─────────────────────────────────────────────────────

#[test]
fn concurrent_sessions_and_saves_leave_consistent_state() {
    let dir = tempfile::tempdir().unwrap();
    let config = HostConfig::new(dir.path().join("devices.toml"));
    let host = DeckHost::init(config.clone()).unwrap();
    let events = record_events(&host);

    let devices: Vec<DeviceIdentity> = (0..4)
        .map(|i| DeviceIdentity::new(DeviceId::generate(), format!("deck-{i}"), format!("/decks/{i}")))
        .collect();

    let workers: Vec<_> = devices
        .iter()
        .cloned()
        .map(|device| {
            let host = host.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let session = ConnectionState::accept(None);
                    host.device_connected(&session, device.clone());
                    assert!(host.is_online(&device.device_id));
                    host.save().unwrap();
                    host.device_disconnected(&session);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert!(host.registry().is_empty());
    assert_eq!(host.store().len(), devices.len());
    assert_eq!(events.lock().len(), devices.len() * 50 * 2);

    let reloaded = DeckHost::init(config).unwrap();
    let mut reloaded_ids: Vec<_> = reloaded
        .store()
        .known_devices()
        .into_iter()
        .map(|d| d.device_id)
        .collect();
    let mut expected: Vec<_> = devices.iter().map(|d| d.device_id).collect();
    reloaded_ids.sort();
    expected.sort();
    assert_eq!(reloaded_ids, expected);
}

#[tokio::test]
async fn async_consumers_see_events_and_bindings() {
    let dir = tempfile::tempdir().unwrap();
    let host = DeckHost::init(HostConfig::new(dir.path().join("devices.toml"))).unwrap();
    let mut events = host.events();
    let mut bindings = host.subscribe_bindings();

    let device = DeviceIdentity::new(DeviceId::generate(), "desk", "/decks/desk");
    let session = ConnectionState::accept(None);
    host.device_connected(&session, device.clone());

    let event = events.recv().await.unwrap();
    assert_eq!(event.kind(), "connected");
    assert_eq!(event.identity().device_id, device.device_id);

    let snapshot = bindings.changed().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].session_id, session.session_id);
}

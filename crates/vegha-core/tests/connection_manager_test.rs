#![allow(clippy::unwrap_used)]

// Integration tests for `ConnectionManager` driven by an in-memory transport.
//
// Time is paused, so reconnect and stale-data deadlines elapse as soon as
// the runtime goes idle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::time::timeout;

use vegha_core::{
    BackendConfig, ConnectionManager, ConnectionState, CoreError, EventSink, MetricsSnapshot,
    OutboundEvent, PlaybackSpeed, ReconnectPolicy, ReconnectStatus, SimulationCommand,
    StateTransition, Transport, TransportEvent,
};

use ConnectionState::{Connected, Connecting, Disconnected, Error};

// ── Fake transport ──────────────────────────────────────────────────

#[derive(Default)]
struct FakeState {
    sinks: Vec<EventSink>,
    closes: usize,
    emitted: Vec<OutboundEvent>,
}

/// Records every call; tests play the backend through the captured sinks.
#[derive(Clone, Default)]
struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
    /// Fail every handshake immediately.
    refuse: bool,
}

impl FakeTransport {
    fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    fn opens(&self) -> usize {
        self.state.lock().unwrap().sinks.len()
    }

    fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    fn sink(&self, index: usize) -> EventSink {
        self.state.lock().unwrap().sinks[index].clone()
    }

    fn latest_sink(&self) -> EventSink {
        self.state.lock().unwrap().sinks.last().unwrap().clone()
    }

    fn emitted(&self) -> Vec<OutboundEvent> {
        self.state.lock().unwrap().emitted.clone()
    }
}

impl Transport for FakeTransport {
    fn open(&mut self, sink: EventSink) {
        if self.refuse {
            sink.emit(TransportEvent::Error {
                message: "connection refused".into(),
            });
        }
        self.state.lock().unwrap().sinks.push(sink);
    }

    fn close(&mut self) {
        self.state.lock().unwrap().closes += 1;
    }

    fn emit(&mut self, event: OutboundEvent) -> Result<(), vegha_api::Error> {
        self.state.lock().unwrap().emitted.push(event);
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn config(max_attempts: u32) -> BackendConfig {
    let mut config = BackendConfig::from_url("http://sim.test:5000").unwrap();
    config.reconnect = ReconnectPolicy {
        delay: Duration::from_secs(1),
        max_attempts,
    };
    config
}

fn transition(from: ConnectionState, to: ConnectionState) -> (ConnectionState, ConnectionState) {
    (from, to)
}

async fn next_transition(rx: &mut broadcast::Receiver<StateTransition>) -> StateTransition {
    timeout(Duration::from_secs(30), rx.recv())
        .await
        .expect("no transition within 30s")
        .unwrap()
}

async fn next_change(
    rx: &mut broadcast::Receiver<StateTransition>,
) -> (ConnectionState, ConnectionState) {
    let t = next_transition(rx).await;
    (t.from, t.to)
}

async fn assert_quiet(rx: &mut broadcast::Receiver<StateTransition>) {
    let res = timeout(Duration::from_secs(10), rx.recv()).await;
    assert!(res.is_err(), "unexpected transition: {res:?}");
}

/// Round-trips a request through the actor so earlier requests are applied.
async fn sync(manager: &ConnectionManager) {
    let _ = manager.execute(SimulationCommand::Pause).await;
}

async fn connect(
    manager: &ConnectionManager,
    fake: &FakeTransport,
    rx: &mut broadcast::Receiver<StateTransition>,
) {
    manager.open();
    assert_eq!(next_transition(rx).await.to, Connecting);
    fake.latest_sink().emit(TransportEvent::Connected);
    assert_eq!(next_change(rx).await, transition(Connecting, Connected));
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn starts_disconnected_with_default_snapshot() {
    let fake = FakeTransport::default();
    let mut cfg = config(5);
    cfg.static_signal_count = Some(9);
    let manager = ConnectionManager::new(cfg, fake.clone());

    assert_eq!(manager.state(), Disconnected);
    assert_eq!(*manager.snapshot(), MetricsSnapshot::with_signals(9));
    assert_eq!(fake.opens(), 0);
}

#[tokio::test(start_paused = true)]
async fn close_while_connecting_suppresses_late_connect() {
    let fake = FakeTransport::default();
    let manager = ConnectionManager::new(config(5), fake.clone());
    let mut rx = manager.transitions();

    manager.open();
    assert_eq!(next_change(&mut rx).await, transition(Disconnected, Connecting));

    let sink = fake.sink(0);
    manager.close();
    assert_eq!(next_change(&mut rx).await, transition(Connecting, Disconnected));

    // The abandoned handshake completes after close().
    sink.emit(TransportEvent::Connected);
    sink.emit(TransportEvent::Update(json!({"vehicles": {"a": {}}})));

    assert_quiet(&mut rx).await;
    assert_eq!(manager.state(), Disconnected);
    assert_eq!(manager.snapshot().vehicle_count, 0);
    assert_eq!(fake.opens(), 1);
    assert_eq!(fake.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn open_is_idempotent_while_connecting() {
    let fake = FakeTransport::default();
    let manager = ConnectionManager::new(config(5), fake.clone());
    let mut rx = manager.transitions();

    manager.open();
    manager.open();
    sync(&manager).await;

    assert_eq!(next_change(&mut rx).await, transition(Disconnected, Connecting));
    assert!(rx.try_recv().is_err());
    assert_eq!(fake.opens(), 1);

    // Still a no-op once connected.
    fake.sink(0).emit(TransportEvent::Connected);
    assert_eq!(next_change(&mut rx).await, transition(Connecting, Connected));
    manager.open();
    sync(&manager).await;
    assert_eq!(fake.opens(), 1);
}

#[tokio::test(start_paused = true)]
async fn refresh_is_close_then_open() {
    let fake = FakeTransport::default();
    let manager = ConnectionManager::new(config(5), fake.clone());
    let mut rx = manager.transitions();
    connect(&manager, &fake, &mut rx).await;

    manager.refresh();

    assert_eq!(next_change(&mut rx).await, transition(Connected, Disconnected));
    assert_eq!(next_change(&mut rx).await, transition(Disconnected, Connecting));
    assert_eq!(fake.opens(), 2);
    assert_eq!(fake.closes(), 1);

    // Only the new session counts.
    fake.sink(0).emit(TransportEvent::Connected);
    sync(&manager).await;
    assert_eq!(manager.state(), Connecting);
    fake.sink(1).emit(TransportEvent::Connected);
    assert_eq!(next_change(&mut rx).await, transition(Connecting, Connected));
}

// ── Reconnect policy ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn exhausted_budget_settles_disconnected() {
    let fake = FakeTransport::refusing();
    let manager = ConnectionManager::new(config(3), fake.clone());
    let mut rx = manager.transitions();

    manager.open();
    assert_eq!(next_change(&mut rx).await, transition(Disconnected, Connecting));
    assert_eq!(next_change(&mut rx).await, transition(Connecting, Error));

    for attempt in 1..=3 {
        assert_eq!(
            manager.reconnect_status(),
            ReconnectStatus::Retrying {
                attempt,
                max_attempts: 3
            }
        );
        assert_eq!(next_change(&mut rx).await, transition(Error, Connecting));
        assert_eq!(next_change(&mut rx).await, transition(Connecting, Error));
    }
    assert_eq!(next_change(&mut rx).await, transition(Error, Disconnected));
    assert_eq!(
        manager.reconnect_status(),
        ReconnectStatus::Exhausted { attempts: 3 }
    );

    assert_quiet(&mut rx).await;
    assert_eq!(manager.state(), Disconnected);
    assert_eq!(fake.opens(), 4);

    // An explicit open() gets a fresh budget.
    manager.open();
    assert_eq!(next_change(&mut rx).await, transition(Disconnected, Connecting));
    assert_eq!(fake.opens(), 5);
    assert_eq!(manager.reconnect_status(), ReconnectStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn transitions_carry_reconnect_status() {
    let fake = FakeTransport::refusing();
    let manager = ConnectionManager::new(config(1), fake.clone());
    let mut rx = manager.transitions();

    manager.open();
    let mut seen = Vec::new();
    for _ in 0..5 {
        let t = next_transition(&mut rx).await;
        seen.push((t.to, t.reconnect));
    }

    let retrying = ReconnectStatus::Retrying {
        attempt: 1,
        max_attempts: 1,
    };
    let exhausted = ReconnectStatus::Exhausted { attempts: 1 };
    assert_eq!(
        seen,
        vec![
            (Connecting, ReconnectStatus::Idle),
            (Error, retrying),
            (Connecting, retrying),
            (Error, exhausted),
            (Disconnected, exhausted),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn zero_budget_never_retries() {
    let fake = FakeTransport::refusing();
    let manager = ConnectionManager::new(config(0), fake.clone());
    let mut rx = manager.transitions();

    manager.open();
    assert_eq!(next_transition(&mut rx).await.to, Connecting);
    assert_eq!(next_transition(&mut rx).await.to, Error);
    assert_eq!(next_transition(&mut rx).await.to, Disconnected);
    assert_quiet(&mut rx).await;
    assert_eq!(fake.opens(), 1);
}

#[tokio::test(start_paused = true)]
async fn server_disconnect_triggers_reconnect() {
    let fake = FakeTransport::default();
    let manager = ConnectionManager::new(config(5), fake.clone());
    let mut rx = manager.transitions();
    connect(&manager, &fake, &mut rx).await;

    fake.sink(0).emit(TransportEvent::Disconnected {
        reason: "server namespace disconnect".into(),
    });

    assert_eq!(next_change(&mut rx).await, transition(Connected, Disconnected));
    assert_eq!(next_change(&mut rx).await, transition(Disconnected, Connecting));
    assert_eq!(fake.opens(), 2);
}

#[tokio::test(start_paused = true)]
async fn close_cancels_pending_reconnect() {
    let fake = FakeTransport::default();
    let manager = ConnectionManager::new(config(5), fake.clone());
    let mut rx = manager.transitions();
    connect(&manager, &fake, &mut rx).await;

    fake.sink(0).emit(TransportEvent::Error {
        message: "reset by peer".into(),
    });
    assert_eq!(next_change(&mut rx).await, transition(Connected, Error));

    manager.close();
    assert_eq!(next_change(&mut rx).await, transition(Error, Disconnected));

    assert_quiet(&mut rx).await;
    assert_eq!(fake.opens(), 1);
}

#[tokio::test(start_paused = true)]
async fn successful_handshake_resets_attempts() {
    let fake = FakeTransport::default();
    let manager = ConnectionManager::new(config(1), fake.clone());
    let mut rx = manager.transitions();
    connect(&manager, &fake, &mut rx).await;

    // Lose the session, reconnect once, succeed, lose it again: the
    // single-attempt budget is available again the second time.
    for round in 0..2 {
        fake.latest_sink().emit(TransportEvent::Error {
            message: "drop".into(),
        });
        assert_eq!(next_change(&mut rx).await, transition(Connected, Error));
        assert_eq!(next_change(&mut rx).await, transition(Error, Connecting));
        assert_eq!(fake.opens(), round + 2);
        fake.latest_sink().emit(TransportEvent::Connected);
        assert_eq!(next_change(&mut rx).await, transition(Connecting, Connected));
    }
}

// ── Metrics ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn updates_replace_the_snapshot() {
    let fake = FakeTransport::default();
    let manager = ConnectionManager::new(config(5), fake.clone());
    let mut rx = manager.transitions();
    let mut metrics = manager.metrics();
    connect(&manager, &fake, &mut rx).await;

    fake.sink(0).emit(TransportEvent::Update(json!({
        "vehicles": {"a": 1, "b": 2},
        "avg_speed": 42,
        "traffic_lights": {},
    })));
    let snap = metrics.changed().await.unwrap();
    assert_eq!(snap.vehicle_count, 2);
    assert!(manager.store().last_update().is_some());

    fake.sink(0).emit(TransportEvent::Update(json!({"waiting": 3})));
    let snap = metrics.changed().await.unwrap();
    // Whole replacement: nothing carried over from the previous update.
    assert_eq!(
        *snap,
        MetricsSnapshot {
            waiting: 3,
            ..MetricsSnapshot::default()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn failed_retry_discards_stale_snapshot() {
    let fake = FakeTransport::default();
    let mut cfg = config(5);
    cfg.static_signal_count = Some(4);
    let manager = ConnectionManager::new(cfg, fake.clone());
    let mut rx = manager.transitions();
    let mut metrics = manager.metrics();
    connect(&manager, &fake, &mut rx).await;

    fake.sink(0).emit(TransportEvent::Update(json!({"time": 12.5})));
    let live = metrics.changed().await.unwrap();
    assert!((live.sim_time - 12.5).abs() < f64::EPSILON);

    fake.sink(0).emit(TransportEvent::Disconnected {
        reason: "transport close".into(),
    });
    assert_eq!(next_transition(&mut rx).await.to, Disconnected);
    assert_eq!(next_transition(&mut rx).await.to, Connecting);
    assert!((manager.snapshot().sim_time - 12.5).abs() < f64::EPSILON);

    let lost_at = tokio::time::Instant::now();
    fake.sink(1).emit(TransportEvent::Error {
        message: "connection refused".into(),
    });
    let reset = metrics.changed().await.unwrap();
    assert_eq!(*reset, MetricsSnapshot::with_signals(4));
    assert!(manager.store().last_update().is_none());
    assert!(lost_at.elapsed() < Duration::from_secs(1));
    assert_eq!(next_change(&mut rx).await, transition(Connecting, Error));
}

#[tokio::test(start_paused = true)]
async fn hung_retry_discards_snapshot_after_full_cycle() {
    let fake = FakeTransport::default();
    let mut cfg = config(5);
    cfg.timeout = Duration::from_secs(10);
    let manager = ConnectionManager::new(cfg, fake.clone());
    let mut rx = manager.transitions();
    let mut metrics = manager.metrics();
    connect(&manager, &fake, &mut rx).await;

    fake.sink(0).emit(TransportEvent::Update(json!({"vehicles": {"a": 1}})));
    metrics.changed().await.unwrap();

    let lost_at = tokio::time::Instant::now();
    fake.sink(0).emit(TransportEvent::Disconnected {
        reason: "transport close".into(),
    });
    assert_eq!(next_transition(&mut rx).await.to, Disconnected);
    assert_eq!(next_transition(&mut rx).await.to, Connecting);

    // Retry delay has passed but the handshake is still within its timeout.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(manager.snapshot().vehicle_count, 1);

    let reset = timeout(Duration::from_secs(30), metrics.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reset.vehicle_count, 0);
    assert!(lost_at.elapsed() >= Duration::from_secs(11));
    assert_eq!(manager.state(), Connecting);
}

#[tokio::test(start_paused = true)]
async fn automatic_reconnect_keeps_snapshot() {
    let fake = FakeTransport::default();
    let manager = ConnectionManager::new(config(5), fake.clone());
    let mut rx = manager.transitions();
    let mut metrics = manager.metrics();
    connect(&manager, &fake, &mut rx).await;

    fake.sink(0).emit(TransportEvent::Update(json!({"vehicles": {"a": 1}})));
    metrics.changed().await.unwrap();

    fake.sink(0).emit(TransportEvent::Disconnected {
        reason: "transport close".into(),
    });
    assert_eq!(next_transition(&mut rx).await.to, Disconnected);
    assert_eq!(next_transition(&mut rx).await.to, Connecting);
    fake.sink(1).emit(TransportEvent::Connected);
    assert_eq!(next_change(&mut rx).await, transition(Connecting, Connected));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(manager.snapshot().vehicle_count, 1);
    assert!(manager.store().last_update().is_some());
}

#[tokio::test(start_paused = true)]
async fn quick_reconnect_keeps_snapshot() {
    let fake = FakeTransport::default();
    let manager = ConnectionManager::new(config(5), fake.clone());
    let mut rx = manager.transitions();
    let mut metrics = manager.metrics();
    connect(&manager, &fake, &mut rx).await;

    fake.sink(0).emit(TransportEvent::Update(json!({"vehicles": {"a": 1}})));
    metrics.changed().await.unwrap();

    manager.refresh();
    assert_eq!(next_transition(&mut rx).await.to, Disconnected);
    assert_eq!(next_transition(&mut rx).await.to, Connecting);
    fake.sink(1).emit(TransportEvent::Connected);
    assert_eq!(next_transition(&mut rx).await.to, Connected);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(manager.snapshot().vehicle_count, 1);
}

// ── Simulation control ──────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn execute_requires_connection() {
    let fake = FakeTransport::default();
    let manager = ConnectionManager::new(config(5), fake.clone());
    let mut rx = manager.transitions();

    let err = manager.execute(SimulationCommand::Start).await.unwrap_err();
    assert!(matches!(err, CoreError::NotConnected));

    connect(&manager, &fake, &mut rx).await;
    manager.execute(SimulationCommand::Start).await.unwrap();
    let speed = PlaybackSpeed::from_multiplier(1.5).unwrap();
    manager.execute(SimulationCommand::Speed(speed)).await.unwrap();

    assert_eq!(
        fake.emitted(),
        vec![
            OutboundEvent::new("start"),
            OutboundEvent::new("speed").with_payload(json!({"speed": 1.5})),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_transport() {
    let fake = FakeTransport::default();
    let manager = ConnectionManager::new(config(5), fake.clone());
    let mut rx = manager.transitions();
    connect(&manager, &fake, &mut rx).await;

    manager.shutdown();

    assert_eq!(next_change(&mut rx).await, transition(Connected, Disconnected));
    assert_eq!(fake.closes(), 1);
    let err = manager.execute(SimulationCommand::Reset).await.unwrap_err();
    assert!(matches!(err, CoreError::NotConnected));
}

// ── Connection manager ──
//
// Owns the lifecycle of one live connection to the simulation backend:
// open, close, refresh, bounded fixed-delay reconnect, and the metrics
// snapshot fed by `update` events.
//
// All mutation happens inside a single actor task. Handles only send
// requests and read the published `watch`/`broadcast` channels, so state
// and snapshot are read-only to consumers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vegha_api::{EventSink, SessionEvent, SessionId, SocketIoTransport, Transport, TransportEvent};

use crate::config::{BackendConfig, ReconnectPolicy};
use crate::error::CoreError;
use crate::model::{
    ConnectionState, MetricsSnapshot, ReconnectStatus, SimulationCommand, StateTransition,
};
use crate::normalize::Normalizer;
use crate::store::MetricsStore;
use crate::stream::SnapshotStream;

const TRANSITION_CHANNEL_SIZE: usize = 64;

// ── Requests ─────────────────────────────────────────────────────

enum Request {
    Open,
    Close,
    Refresh,
    Execute {
        command: SimulationCommand,
        reply: oneshot::Sender<Result<(), CoreError>>,
    },
}

// ── ConnectionManager ────────────────────────────────────────────

/// Handle to a running connection manager.
///
/// Cheaply cloneable. The background task stops on [`shutdown()`](Self::shutdown)
/// or when the last handle is dropped, tearing down the transport.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    config: BackendConfig,
    shared: Arc<Shared>,
    request_tx: mpsc::UnboundedSender<Request>,
    cancel: CancellationToken,
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Channels written by the actor and read by handles.
struct Shared {
    state: watch::Sender<ConnectionState>,
    reconnect: watch::Sender<ReconnectStatus>,
    transitions: broadcast::Sender<StateTransition>,
    store: Arc<MetricsStore>,
}

impl ConnectionManager {
    /// Start a manager driving `transport`. Starts `disconnected`; call
    /// [`open()`](Self::open) to connect.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new<T: Transport>(config: BackendConfig, transport: T) -> Self {
        let normalizer = Normalizer::new(config.static_signal_count);
        let store = Arc::new(MetricsStore::new(normalizer.defaults()));
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (reconnect, _) = watch::channel(ReconnectStatus::Idle);
        let (transitions, _) = broadcast::channel(TRANSITION_CHANNEL_SIZE);
        let shared = Arc::new(Shared {
            state,
            reconnect,
            transitions,
            store,
        });

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let actor = Actor {
            transport,
            shared: Arc::clone(&shared),
            policy: config.reconnect,
            stale_after: config.reconnect.delay + config.timeout,
            normalizer,
            session: SessionId::default(),
            attempts: 0,
            reconnect_at: None,
            stale_at: None,
            event_tx,
        };
        tokio::spawn(actor.run(request_rx, event_rx, cancel.clone()));

        Self {
            inner: Arc::new(ManagerInner {
                config,
                shared,
                request_tx,
                cancel,
            }),
        }
    }

    /// Manager backed by the Socket.IO transport at `config.url`.
    pub fn with_socketio(config: BackendConfig) -> Self {
        let transport = SocketIoTransport::new(config.socketio_config());
        Self::new(config, transport)
    }

    pub fn config(&self) -> &BackendConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<MetricsStore> {
        &self.inner.shared.store
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Begin connecting. No-op while `connecting` or `connected`.
    /// Resets the automatic reconnect budget.
    pub fn open(&self) {
        self.send(Request::Open);
    }

    /// Tear the connection down and settle at `disconnected`. Cancels any
    /// pending reconnect.
    pub fn close(&self) {
        self.send(Request::Close);
    }

    /// `close()` followed by `open()`.
    pub fn refresh(&self) {
        self.send(Request::Refresh);
    }

    /// Stop the background task. The transport is closed and the state
    /// settles at `disconnected`; later requests are ignored.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    fn send(&self, request: Request) {
        if self.inner.request_tx.send(request).is_err() {
            debug!("connection manager stopped; request ignored");
        }
    }

    // ── Simulation control ───────────────────────────────────────

    /// Send a control command through the live session.
    pub async fn execute(&self, command: SimulationCommand) -> Result<(), CoreError> {
        let (reply, rx) = oneshot::channel();
        self.inner
            .request_tx
            .send(Request::Execute { command, reply })
            .map_err(|_| CoreError::NotConnected)?;
        rx.await.map_err(|_| CoreError::NotConnected)?
    }

    // ── Observation ──────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        *self.inner.shared.state.borrow()
    }

    /// Subscribe to the current connection state.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.shared.state.subscribe()
    }

    /// Automatic reconnect progress. Updated before the state transition
    /// that it explains is published.
    pub fn reconnect_status(&self) -> ReconnectStatus {
        *self.inner.shared.reconnect.borrow()
    }

    /// Every transition, exactly once, in order.
    pub fn transitions(&self) -> broadcast::Receiver<StateTransition> {
        self.inner.shared.transitions.subscribe()
    }

    pub fn snapshot(&self) -> Arc<MetricsSnapshot> {
        self.inner.shared.store.snapshot()
    }

    pub fn metrics(&self) -> SnapshotStream {
        self.inner.shared.store.subscribe()
    }
}

// ── Actor ────────────────────────────────────────────────────────

struct Actor<T> {
    transport: T,
    shared: Arc<Shared>,
    policy: ReconnectPolicy,
    /// One reconnect cycle: the retry delay plus a full handshake timeout.
    stale_after: Duration,
    normalizer: Normalizer,
    /// Id of the current (or last) transport session. Events tagged with
    /// any other id are stale.
    session: SessionId,
    /// Automatic attempts since the last successful handshake.
    attempts: u32,
    reconnect_at: Option<Instant>,
    /// Live data is discarded once this passes without a reconnect, or
    /// earlier if a reconnect attempt fails.
    stale_at: Option<Instant>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl<T: Transport> Actor<T> {
    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request>,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                request = requests.recv() => match request {
                    Some(request) => self.handle_request(request),
                    None => break,
                },
                Some(event) = events.recv() => self.handle_event(event),
                () = sleep_until_opt(self.reconnect_at) => {
                    self.reconnect_at = None;
                    info!(attempt = self.attempts, "reconnecting");
                    self.begin_handshake();
                }
                () = sleep_until_opt(self.stale_at) => self.discard_stale(),
            }
        }

        self.transport.close();
        self.session = self.session.next();
        self.set_state(ConnectionState::Disconnected);
        debug!("connection manager stopped");
    }

    fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    // ── Requests ─────────────────────────────────────────────────

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::Open => self.open(),
            Request::Close => self.close(),
            Request::Refresh => {
                debug!("refresh requested");
                self.close();
                self.open();
            }
            Request::Execute { command, reply } => {
                let result = self.execute(command);
                // Caller may have given up waiting.
                let _ = reply.send(result);
            }
        }
    }

    fn open(&mut self) {
        let state = self.state();
        if state.is_active() {
            debug!(%state, "open ignored; already active");
            return;
        }
        self.reset_reconnect();
        self.begin_handshake();
    }

    fn close(&mut self) {
        self.reset_reconnect();
        self.session = self.session.next();
        self.transport.close();
        self.set_state(ConnectionState::Disconnected);
    }

    fn execute(&mut self, command: SimulationCommand) -> Result<(), CoreError> {
        if self.state() != ConnectionState::Connected {
            return Err(CoreError::NotConnected);
        }
        debug!(event = command.event_name(), "sending simulation command");
        self.transport.emit(command.to_outbound())?;
        Ok(())
    }

    fn begin_handshake(&mut self) {
        self.session = self.session.next();
        self.set_state(ConnectionState::Connecting);
        debug!(session = %self.session, "starting handshake");
        self.transport
            .open(EventSink::new(self.session, self.event_tx.clone()));
    }

    // ── Transport events ─────────────────────────────────────────

    fn handle_event(&mut self, SessionEvent { session, event }: SessionEvent) {
        if session != self.session {
            debug!(%session, current = %self.session, "dropping event from stale session");
            return;
        }

        match event {
            TransportEvent::Connected => {
                if self.state() != ConnectionState::Connecting {
                    return;
                }
                self.reset_reconnect();
                self.set_state(ConnectionState::Connected);
            }
            TransportEvent::Update(payload) => {
                if self.state() != ConnectionState::Connected {
                    return;
                }
                self.shared.store.replace(self.normalizer.normalize(&payload));
            }
            TransportEvent::Error { message } => {
                warn!(%session, error = %message, "transport error");
                self.lose_session(ConnectionState::Error);
            }
            TransportEvent::Disconnected { reason } => {
                info!(%session, %reason, "backend closed the connection");
                self.lose_session(ConnectionState::Disconnected);
            }
        }
    }

    fn lose_session(&mut self, state: ConnectionState) {
        // A reconnect handshake failing ends the cycle the data was kept for.
        let retry_failed = self.state() == ConnectionState::Connecting;
        self.transport.close();
        self.session = self.session.next();
        let retrying = self.schedule_reconnect();
        self.set_state(state);
        if !retrying {
            self.set_state(ConnectionState::Disconnected);
        }
        if retry_failed && self.stale_at.is_some() {
            self.discard_stale();
        }
    }

    fn discard_stale(&mut self) {
        self.stale_at = None;
        if self.state() != ConnectionState::Connected && self.shared.store.reset() {
            info!("connection lost; discarded stale metrics");
        }
    }

    /// Arm the reconnect timer. Returns `false` once the budget is spent.
    fn schedule_reconnect(&mut self) -> bool {
        if self.attempts >= self.policy.max_attempts {
            warn!(
                attempts = self.attempts,
                "reconnect attempts exhausted; staying disconnected"
            );
            self.shared.reconnect.send_replace(ReconnectStatus::Exhausted {
                attempts: self.attempts,
            });
            return false;
        }
        self.attempts += 1;
        self.reconnect_at = Some(Instant::now() + self.policy.delay);
        self.shared.reconnect.send_replace(ReconnectStatus::Retrying {
            attempt: self.attempts,
            max_attempts: self.policy.max_attempts,
        });
        debug!(
            attempt = self.attempts,
            delay_ms = self.policy.delay_ms(),
            "reconnect scheduled"
        );
        true
    }

    fn reset_reconnect(&mut self) {
        self.attempts = 0;
        self.reconnect_at = None;
        self.shared.reconnect.send_replace(ReconnectStatus::Idle);
    }

    // ── State publication ────────────────────────────────────────

    /// Publish a state change. Repeating the current state is a no-op, so
    /// every transition is announced exactly once.
    fn set_state(&mut self, to: ConnectionState) {
        let from = self.state();
        if from == to {
            return;
        }
        self.shared.state.send_replace(to);
        let reconnect = *self.shared.reconnect.borrow();
        // No subscribers is fine.
        let _ = self.shared.transitions.send(StateTransition {
            from,
            to,
            reconnect,
        });
        info!(%from, state = %to, "connection state changed");

        if to == ConnectionState::Connected {
            self.stale_at = None;
        } else if from == ConnectionState::Connected {
            self.stale_at = Some(Instant::now() + self.stale_after);
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

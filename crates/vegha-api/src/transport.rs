// ── Abstract push transport ──
//
// The capability the connection manager drives: open a session, close it,
// push outbound events, and report lifecycle + update events through an
// `EventSink`. The Socket.IO implementation lives in `websocket.rs`; tests
// substitute a fake that emits synthetic events on demand.

use std::fmt;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Error;

/// Identifies one `open()` call. Events carry the id of the session that
/// produced them so that late events from a superseded session can be
/// recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something that happened on a transport session.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Handshake completed; the session is live.
    Connected,
    /// Raw `update` payload pushed by the backend.
    Update(Value),
    /// The server ended the session (close frame, namespace disconnect,
    /// stream end).
    Disconnected { reason: String },
    /// Handshake failure or a mid-session transport error.
    Error { message: String },
}

/// A [`TransportEvent`] tagged with the session that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub session: SessionId,
    pub event: TransportEvent,
}

/// Delivery handle given to [`Transport::open`].
///
/// Cloneable; every clone tags events with the same session id.
#[derive(Debug, Clone)]
pub struct EventSink {
    session: SessionId,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    pub fn new(session: SessionId, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Deliver an event. Returns `false` once the receiving side is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(SessionEvent {
                session: self.session,
                event,
            })
            .is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A named event sent to the backend, e.g. `start` or `speed {speed: 1.5}`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEvent {
    pub name: String,
    pub payload: Option<Value>,
}

impl OutboundEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// A real-time push channel to the backend.
///
/// Contract for implementors:
/// - `open` starts exactly one handshake and returns without blocking. The
///   outcome is reported through `sink`: `Connected` on success, followed by
///   any number of `Update`s, and finally one `Disconnected` or `Error`.
///   A failed handshake reports a single `Error`.
/// - `close` tears the current session down. Nothing further should be
///   emitted on its sink; consumers still filter by [`SessionId`].
/// - `emit` queues an outbound event on the live session.
pub trait Transport: Send + 'static {
    fn open(&mut self, sink: EventSink);

    fn close(&mut self);

    fn emit(&mut self, event: OutboundEvent) -> Result<(), Error>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self, sink: EventSink) {
        (**self).open(sink);
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn emit(&mut self, event: OutboundEvent) -> Result<(), Error> {
        (**self).emit(event)
    }
}

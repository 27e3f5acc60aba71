//! Socket.IO session over a WebSocket.
//!
//! [`SocketIoTransport`] implements [`Transport`] against a Flask-SocketIO
//! backend: each `open()` spawns one background task that performs the
//! Engine.IO + Socket.IO handshake, answers server pings, forwards `update`
//! events to the [`EventSink`] and writes queued outbound events. The task
//! never reconnects on its own; reconnection policy belongs to the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use tokio::sync::mpsc;
//! use vegha_api::transport::{EventSink, SessionId, Transport};
//! use vegha_api::websocket::{SocketIoConfig, SocketIoTransport};
//!
//! let config = SocketIoConfig::new("http://localhost:5000".parse()?);
//! let mut transport = SocketIoTransport::new(config);
//!
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! transport.open(EventSink::new(SessionId::default(), tx));
//!
//! while let Some(evt) = rx.recv().await {
//!     println!("{:?}", evt.event);
//! }
//! ```

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::packet::{DEFAULT_NAMESPACE, EnginePacket, OpenHandshake, SocketPacket};
use crate::transport::{EventSink, OutboundEvent, Transport, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Event name the backend uses for metric pushes.
pub const UPDATE_EVENT: &str = "update";

const SOCKET_IO_PATH: &str = "/socket.io/";

// ── SocketIoConfig ───────────────────────────────────────────────────

/// Connection settings for a Socket.IO session.
#[derive(Debug, Clone)]
pub struct SocketIoConfig {
    /// Backend base URL, e.g. `http://localhost:5000`.
    pub base_url: Url,
    /// Upper bound on connect + Engine.IO open + Socket.IO connect.
    pub handshake_timeout: Duration,
    /// Socket.IO namespace. Default: `/`.
    pub namespace: String,
}

impl SocketIoConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            handshake_timeout: Duration::from_secs(10),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    /// Derive the WebSocket endpoint from the base URL.
    ///
    /// `http://host:5000` becomes
    /// `ws://host:5000/socket.io/?EIO=4&transport=websocket`.
    pub fn endpoint(&self) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(Error::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|()| Error::UnsupportedScheme(scheme.to_string()))?;
        url.set_path(SOCKET_IO_PATH);
        url.set_query(Some("EIO=4&transport=websocket"));
        url.set_fragment(None);
        Ok(url)
    }
}

// ── SocketIoTransport ────────────────────────────────────────────────

struct ActiveSession {
    cancel: CancellationToken,
    outbound: mpsc::UnboundedSender<String>,
}

/// [`Transport`] backed by a Socket.IO WebSocket session.
///
/// Holds at most one session; `open()` tears down the previous one first.
pub struct SocketIoTransport {
    config: SocketIoConfig,
    active: Option<ActiveSession>,
}

impl SocketIoTransport {
    pub fn new(config: SocketIoConfig) -> Self {
        Self {
            config,
            active: None,
        }
    }

    pub fn config(&self) -> &SocketIoConfig {
        &self.config
    }
}

impl Transport for SocketIoTransport {
    fn open(&mut self, sink: EventSink) {
        self.close();

        let cancel = CancellationToken::new();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        tracing::debug!(session = %sink.session(), "spawning socket.io session");
        tokio::spawn(run_session(
            self.config.clone(),
            sink,
            cancel.clone(),
            outbound_rx,
        ));

        self.active = Some(ActiveSession { cancel, outbound });
    }

    fn close(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }

    fn emit(&mut self, event: OutboundEvent) -> Result<(), Error> {
        let active = self.active.as_ref().ok_or(Error::NotConnected)?;
        let frame = SocketPacket::Event {
            namespace: self.config.namespace.clone(),
            id: None,
            name: event.name,
            args: event.payload.into_iter().collect(),
        }
        .to_frame();
        active.outbound.send(frame).map_err(|_| Error::NotConnected)
    }
}

impl Drop for SocketIoTransport {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Session task ─────────────────────────────────────────────────────

/// One session: handshake, then read until it drops. Reports exactly one
/// terminal event unless closed locally.
async fn run_session(
    config: SocketIoConfig,
    sink: EventSink,
    cancel: CancellationToken,
    outbound: mpsc::UnboundedReceiver<String>,
) {
    match drive(&config, &sink, &cancel, outbound).await {
        Ok(None) => {
            tracing::debug!(session = %sink.session(), "socket.io session closed locally");
        }
        Ok(Some(reason)) => {
            tracing::info!(session = %sink.session(), %reason, "socket.io session ended");
            sink.emit(TransportEvent::Disconnected { reason });
        }
        Err(e) => {
            tracing::warn!(session = %sink.session(), error = %e, "socket.io session failed");
            sink.emit(TransportEvent::Error {
                message: e.to_string(),
            });
        }
    }
}

/// `Ok(None)` when cancelled locally, `Ok(Some(reason))` when the server
/// ended the session.
async fn drive(
    config: &SocketIoConfig,
    sink: &EventSink,
    cancel: &CancellationToken,
    outbound: mpsc::UnboundedReceiver<String>,
) -> Result<Option<String>, Error> {
    let endpoint = config.endpoint()?;
    let timeout_ms = u64::try_from(config.handshake_timeout.as_millis()).unwrap_or(u64::MAX);

    let (ws, open) = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(None),
        result = tokio::time::timeout(
            config.handshake_timeout,
            handshake(&endpoint, &config.namespace),
        ) => result.map_err(|_| Error::HandshakeTimeout { timeout_ms })??,
    };

    tracing::info!(sid = %open.sid, url = %endpoint, "socket.io connected");
    sink.emit(TransportEvent::Connected);

    read_loop(ws, &open, sink, cancel, outbound).await
}

/// Open the WebSocket and complete the Engine.IO + Socket.IO handshake.
async fn handshake(endpoint: &Url, namespace: &str) -> Result<(WsStream, OpenHandshake), Error> {
    tracing::info!(url = %endpoint, "connecting to socket.io endpoint");

    let (mut ws, _response) = tokio_tungstenite::connect_async(endpoint.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    let mut open: Option<OpenHandshake> = None;

    loop {
        let text = match ws.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(frame))) => {
                let (code, reason) = frame
                    .map(|cf| (u16::from(cf.code), cf.reason.as_str().to_string()))
                    .unwrap_or((1005, String::new()));
                return Err(Error::WebSocketClosed { code, reason });
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
            None => return Err(Error::WebSocketConnect("stream ended during handshake".into())),
        };

        match EnginePacket::decode(text.as_str())? {
            EnginePacket::Open(handshake) => {
                tracing::debug!(
                    sid = %handshake.sid,
                    ping_interval = handshake.ping_interval,
                    ping_timeout = handshake.ping_timeout,
                    "engine.io open"
                );
                open = Some(handshake);
                send_text(&mut ws, SocketPacket::connect(namespace).to_frame()).await?;
            }
            EnginePacket::Ping => send_text(&mut ws, EnginePacket::Pong.encode()).await?,
            EnginePacket::Message(body) => match SocketPacket::decode(&body)? {
                SocketPacket::Connect { namespace: ns, .. } if ns == namespace => {
                    let open = open.ok_or_else(|| {
                        Error::Protocol("socket.io connect before engine.io open".into())
                    })?;
                    return Ok((ws, open));
                }
                SocketPacket::ConnectError { message, .. } => {
                    return Err(Error::ConnectRefused { message });
                }
                other => {
                    tracing::debug!(packet = ?other, "ignoring packet during handshake");
                }
            },
            EnginePacket::Close => {
                return Err(Error::WebSocketClosed {
                    code: 1000,
                    reason: "engine.io close during handshake".into(),
                });
            }
            _ => {}
        }
    }
}

/// Read frames until the session drops. `Ok(reason)` is a clean
/// server-initiated end, `Err` a transport failure.
async fn read_loop(
    ws: WsStream,
    open: &OpenHandshake,
    sink: &EventSink,
    cancel: &CancellationToken,
    mut outbound: mpsc::UnboundedReceiver<String>,
) -> Result<Option<String>, Error> {
    let (mut write, mut read) = ws.split();

    let window_ms = open.ping_window_ms();
    let window = Duration::from_millis(window_ms);
    let ping_deadline = tokio::time::sleep(window);
    tokio::pin!(ping_deadline);

    loop {
        tokio::select! {
            biased;
            Some(frame) = outbound.recv() => {
                tracing::trace!(%frame, "socket.io send");
                write
                    .send(Message::Text(frame.into()))
                    .await
                    .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
            }
            () = cancel.cancelled() => {
                // Frames queued before close() still go out.
                while let Ok(frame) = outbound.try_recv() {
                    if write.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                let _ = write.send(Message::Close(None)).await;
                return Ok(None);
            }
            () = &mut ping_deadline => {
                return Err(Error::PingTimeout { window_ms });
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match dispatch_frame(text.as_str(), sink) {
                        FrameOutcome::Continue => {}
                        FrameOutcome::Ping => {
                            ping_deadline.as_mut().reset(Instant::now() + window);
                            write
                                .send(Message::Text(EnginePacket::Pong.encode().into()))
                                .await
                                .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
                        }
                        FrameOutcome::Closed(reason) => return Ok(Some(reason)),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame.map_or_else(
                            || "close frame (no payload)".to_string(),
                            |cf| format!("close frame {}: {}", cf.code, cf.reason.as_str()),
                        );
                        return Ok(Some(reason));
                    }
                    Some(Ok(_)) => {
                        // Binary, Ping, Pong, Frame -- ignore
                    }
                    Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
                    None => return Ok(Some("stream ended".into())),
                }
            }
        }
    }
}

async fn send_text(ws: &mut WsStream, frame: String) -> Result<(), Error> {
    ws.send(Message::Text(frame.into()))
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))
}

// ── Frame dispatch ───────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum FrameOutcome {
    Continue,
    Ping,
    Closed(String),
}

/// Decode one text frame and forward any `update` payload.
///
/// Malformed frames are logged and skipped; they never end the session.
fn dispatch_frame(text: &str, sink: &EventSink) -> FrameOutcome {
    let packet = match EnginePacket::decode(text) {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(error = %e, "failed to decode engine.io frame");
            return FrameOutcome::Continue;
        }
    };

    match packet {
        EnginePacket::Ping => FrameOutcome::Ping,
        EnginePacket::Close => FrameOutcome::Closed("engine.io close".into()),
        EnginePacket::Message(body) => match SocketPacket::decode(&body) {
            Ok(SocketPacket::Event { name, args, .. }) if name == UPDATE_EVENT => {
                let payload = args.into_iter().next().unwrap_or(serde_json::Value::Null);
                sink.emit(TransportEvent::Update(payload));
                FrameOutcome::Continue
            }
            Ok(SocketPacket::Event { name, .. }) => {
                tracing::debug!(event = %name, "ignoring unhandled socket.io event");
                FrameOutcome::Continue
            }
            Ok(SocketPacket::Disconnect { namespace }) => {
                FrameOutcome::Closed(format!("server disconnected namespace {namespace}"))
            }
            Ok(other) => {
                tracing::debug!(packet = ?other, "ignoring socket.io packet");
                FrameOutcome::Continue
            }
            Err(e) => {
                tracing::debug!(error = %e, "failed to decode socket.io packet");
                FrameOutcome::Continue
            }
        },
        _ => FrameOutcome::Continue,
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::transport::SessionId;

    fn sink() -> (EventSink, mpsc::UnboundedReceiver<crate::transport::SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSink::new(SessionId::new(3), tx), rx)
    }

    #[test]
    fn endpoint_from_http_base() {
        let cfg = SocketIoConfig::new("http://localhost:5000".parse().unwrap());
        assert_eq!(
            cfg.endpoint().unwrap().as_str(),
            "ws://localhost:5000/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn endpoint_from_https_base_replaces_path() {
        let cfg = SocketIoConfig::new("https://sim.example.com/dashboard?x=1".parse().unwrap());
        assert_eq!(
            cfg.endpoint().unwrap().as_str(),
            "wss://sim.example.com/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn endpoint_rejects_unknown_scheme() {
        let cfg = SocketIoConfig::new("ftp://localhost/".parse().unwrap());
        assert!(matches!(cfg.endpoint(), Err(Error::UnsupportedScheme(s)) if s == "ftp"));
    }

    #[test]
    fn dispatch_forwards_update_payload() {
        let (sink, mut rx) = sink();
        let outcome = dispatch_frame(r#"42["update",{"avg_speed":31}]"#, &sink);

        assert_eq!(outcome, FrameOutcome::Continue);
        let evt = rx.try_recv().unwrap();
        assert_eq!(evt.session, SessionId::new(3));
        assert_eq!(evt.event, TransportEvent::Update(json!({"avg_speed": 31})));
    }

    #[test]
    fn dispatch_update_without_args_yields_null() {
        let (sink, mut rx) = sink();
        dispatch_frame(r#"42["update"]"#, &sink);
        assert_eq!(
            rx.try_recv().unwrap().event,
            TransportEvent::Update(serde_json::Value::Null)
        );
    }

    #[test]
    fn dispatch_ignores_other_events_and_garbage() {
        let (sink, mut rx) = sink();
        assert_eq!(
            dispatch_frame(r#"42["status",{"ok":true}]"#, &sink),
            FrameOutcome::Continue
        );
        assert_eq!(dispatch_frame("not a frame", &sink), FrameOutcome::Continue);
        assert_eq!(dispatch_frame("42[oops", &sink), FrameOutcome::Continue);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dispatch_reports_ping_and_close() {
        let (sink, _rx) = sink();
        assert_eq!(dispatch_frame("2", &sink), FrameOutcome::Ping);
        assert!(matches!(dispatch_frame("1", &sink), FrameOutcome::Closed(_)));
        assert!(matches!(dispatch_frame("41", &sink), FrameOutcome::Closed(_)));
    }

    #[test]
    fn emit_without_session_fails() {
        let mut transport =
            SocketIoTransport::new(SocketIoConfig::new("http://localhost:5000".parse().unwrap()));
        let err = transport.emit(OutboundEvent::new("start")).unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn handshake_failure_reports_error() {
        // Port 9 (discard) on localhost is closed in CI sandboxes.
        let mut cfg = SocketIoConfig::new("http://127.0.0.1:9".parse().unwrap());
        cfg.handshake_timeout = Duration::from_secs(2);
        let mut transport = SocketIoTransport::new(cfg);

        let (sink, mut rx) = sink();
        transport.open(sink);

        let evt = rx.recv().await.unwrap();
        assert!(matches!(evt.event, TransportEvent::Error { .. }));
    }

    #[tokio::test]
    async fn close_during_handshake_is_silent() {
        // Accepts the TCP connection but never answers the upgrade.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut transport =
            SocketIoTransport::new(SocketIoConfig::new(format!("http://{addr}").parse().unwrap()));

        let (sink, mut rx) = sink();
        transport.open(sink);
        transport.close();

        // The session task exits without a terminal event and drops the sink.
        assert!(rx.recv().await.is_none());
    }
}

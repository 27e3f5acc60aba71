//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! Only the subset a WebSocket-only client needs: no long-polling payload
//! batching and no binary attachments.
//!
//! Every WebSocket text frame is one Engine.IO packet whose first character
//! is the packet type. Socket.IO packets ride inside Engine.IO `message`
//! packets:
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,"pingTimeout":20000}   engine open
//! 2                                                         engine ping
//! 40                                                        socket connect
//! 42["update",{"time":12}]                                  socket event
//! 42/admin,17["speed",{"speed":1.5}]                        namespaced event with ack id
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;

/// The default Socket.IO namespace.
pub const DEFAULT_NAMESPACE: &str = "/";

// ── Engine.IO ────────────────────────────────────────────────────────

/// Body of the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

impl OpenHandshake {
    /// How long the client may go without a server ping before the session
    /// is considered dead.
    pub fn ping_window_ms(&self) -> u64 {
        self.ping_interval.saturating_add(self.ping_timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    Ping,
    Pong,
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(frame: &str) -> Result<Self, Error> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| Error::Protocol("empty engine.io frame".into()))?;
        let body = chars.as_str();

        match kind {
            '0' => serde_json::from_str(body)
                .map(Self::Open)
                .map_err(|e| Error::Deserialization {
                    message: format!("engine.io open packet: {e}"),
                    body: body.to_string(),
                }),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping),
            '3' => Ok(Self::Pong),
            '4' => Ok(Self::Message(body.to_string())),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            other => Err(Error::Protocol(format!(
                "unknown engine.io packet type '{other}'"
            ))),
        }
    }

    /// Encode a client-originated packet. Only the packet kinds a client
    /// ever sends are representable.
    pub fn encode(&self) -> String {
        match self {
            Self::Close => "1".into(),
            Self::Ping => "2".into(),
            Self::Pong => "3".into(),
            Self::Message(body) => format!("4{body}"),
            Self::Upgrade => "5".into(),
            Self::Noop | Self::Open(_) => "6".into(),
        }
    }
}

// ── Socket.IO ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        message: String,
    },
}

impl SocketPacket {
    /// Client connect request for `namespace`.
    pub fn connect(namespace: &str) -> Self {
        Self::Connect {
            namespace: namespace.to_string(),
            data: None,
        }
    }

    /// Event on the default namespace with an optional single argument.
    pub fn event(name: impl Into<String>, payload: Option<Value>) -> Self {
        Self::Event {
            namespace: DEFAULT_NAMESPACE.to_string(),
            id: None,
            name: name.into(),
            args: payload.into_iter().collect(),
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            Self::Connect { namespace, .. }
            | Self::Disconnect { namespace }
            | Self::Event { namespace, .. }
            | Self::Ack { namespace, .. }
            | Self::ConnectError { namespace, .. } => namespace,
        }
    }

    /// Decode the body of an Engine.IO `message` packet.
    pub fn decode(body: &str) -> Result<Self, Error> {
        let mut chars = body.chars();
        let kind = chars
            .next()
            .ok_or_else(|| Error::Protocol("empty socket.io packet".into()))?;
        let mut rest = chars.as_str();

        let namespace = if rest.starts_with('/') {
            let (ns, tail) = rest.split_once(',').unwrap_or((rest, ""));
            rest = tail;
            ns.to_string()
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (id_str, json) = rest.split_at(digits);
        let id = if id_str.is_empty() {
            None
        } else {
            Some(
                id_str
                    .parse::<u64>()
                    .map_err(|e| Error::Protocol(format!("bad ack id '{id_str}': {e}")))?,
            )
        };

        let data = if json.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(json).map_err(|e| Error::Deserialization {
                    message: format!("socket.io packet body: {e}"),
                    body: json.to_string(),
                })?,
            )
        };

        match kind {
            '0' => Ok(Self::Connect { namespace, data }),
            '1' => Ok(Self::Disconnect { namespace }),
            '2' => {
                let Some(Value::Array(mut items)) = data else {
                    return Err(Error::Protocol("event packet without an array body".into()));
                };
                if items.is_empty() {
                    return Err(Error::Protocol("event packet without a name".into()));
                }
                let Value::String(name) = items.remove(0) else {
                    return Err(Error::Protocol("event name is not a string".into()));
                };
                Ok(Self::Event {
                    namespace,
                    id,
                    name,
                    args: items,
                })
            }
            '3' => {
                let id = id.ok_or_else(|| Error::Protocol("ack packet without an id".into()))?;
                let args = match data {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                Ok(Self::Ack {
                    namespace,
                    id,
                    args,
                })
            }
            '4' => {
                let message = match data {
                    Some(Value::Object(map)) => map
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("connection refused")
                        .to_string(),
                    Some(Value::String(s)) => s,
                    _ => "connection refused".to_string(),
                };
                Ok(Self::ConnectError { namespace, message })
            }
            '5' | '6' => Err(Error::Protocol(
                "binary socket.io packets are not supported".into(),
            )),
            other => Err(Error::Protocol(format!(
                "unknown socket.io packet type '{other}'"
            ))),
        }
    }

    /// Encode as the body of an Engine.IO `message` packet.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        let (kind, namespace) = match self {
            Self::Connect { namespace, .. } => ('0', namespace),
            Self::Disconnect { namespace } => ('1', namespace),
            Self::Event { namespace, .. } => ('2', namespace),
            Self::Ack { namespace, .. } => ('3', namespace),
            Self::ConnectError { namespace, .. } => ('4', namespace),
        };
        out.push(kind);
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }

        match self {
            Self::Connect { data, .. } => {
                if let Some(data) = data {
                    out.push_str(&data.to_string());
                }
            }
            Self::Disconnect { .. } => {}
            Self::Event { id, name, args, .. } => {
                if let Some(id) = id {
                    out.push_str(&id.to_string());
                }
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                out.push_str(&Value::Array(items).to_string());
            }
            Self::Ack { id, args, .. } => {
                out.push_str(&id.to_string());
                out.push_str(&Value::Array(args.clone()).to_string());
            }
            Self::ConnectError { message, .. } => {
                out.push_str(&serde_json::json!({ "message": message }).to_string());
            }
        }
        out
    }

    /// Encode as a complete WebSocket text frame (`4` + packet).
    pub fn to_frame(&self) -> String {
        EnginePacket::Message(self.encode()).encode()
    }
}

// vegha-api: Async Socket.IO + HTTP client for the Vegha simulation backend

pub mod error;
pub mod http;
pub mod packet;
pub mod transport;
pub mod websocket;

pub use error::Error;
pub use http::{BackendClient, HttpConfig, NetworkBounds};
pub use transport::{EventSink, OutboundEvent, SessionEvent, SessionId, Transport, TransportEvent};
pub use websocket::{SocketIoConfig, SocketIoTransport};

// unimirror-api: Async transport for the UniFi controller legacy API.
//
// Session login, `{ meta, data }` envelope unwrapping, raw resource listing
// and a reconnecting websocket that yields the controller's message stream.

pub mod auth;
pub mod error;
pub mod legacy;
pub mod transport;
pub mod websocket;

pub use auth::ControllerPlatform;
pub use error::Error;
pub use legacy::{LegacyClient, Resource};
pub use transport::{TlsMode, TransportConfig};
pub use websocket::{ReconnectConfig, WebSocketHandle, WebSocketState};

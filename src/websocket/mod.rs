mod handler;
mod hub;
mod message;

pub use handler::{ws_handler, WsQuery};
pub use hub::{CloseReason, ConnectionHub, ProbeTransport};
pub use message::{ClientMessage, OutboundMessage, ServerMessage};

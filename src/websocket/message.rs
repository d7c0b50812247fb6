use serde::{Deserialize, Serialize};

use super::hub::CloseReason;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Application-level heartbeat; counts as a liveness response
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl ServerMessage {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Items queued for a session's send loop
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    /// WebSocket ping frame
    Probe,
    /// Close frame; the send loop stops after writing it
    Close(CloseReason),
    /// JSON text message
    Server(ServerMessage),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_client_ping() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Ping);
    }

    #[test]
    fn test_unknown_client_message_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe"}"#).is_err());
    }

    #[test]
    fn test_server_message_format() {
        assert_eq!(
            serde_json::to_string(&ServerMessage::Pong).unwrap(),
            r#"{"type":"pong"}"#
        );
        let err = serde_json::to_value(ServerMessage::error("INVALID_MESSAGE", "bad")).unwrap();
        assert_eq!(err["type"], "error");
        assert_eq!(err["code"], "INVALID_MESSAGE");
    }
}

//! Envelope messages exchanged over the TrueNAS WebSocket channel.
//!
//! The channel speaks a DDP-style JSON protocol. Every message carries a
//! `msg` discriminator. Two exchanges matter here:
//!
//! ```text
//! {"msg":"connect","version":"1","support":["1"]}   ──►
//!                                                   ◄──  {"msg":"connected",...}
//!
//! {"id":7,"msg":"method","method":"app.stop","params":["plex"]}   ──►
//!                                                                 ◄──  {"id":7,"msg":"result","result":123}
//! ```
//!
//! A `result` message carries either a `result` payload or an `error`
//! object, never both.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtoError;

/// Protocol version declared during the `connect` handshake.
pub const PROTOCOL_VERSION: &str = "1";

/// Remote method names used by nasctl.
pub mod methods {
    /// Authenticate the session with an API key.
    pub const AUTH_LOGIN_WITH_API_KEY: &str = "auth.login_with_api_key";
    /// Fetch a single application descriptor by name.
    pub const APP_GET_INSTANCE: &str = "app.get_instance";
    /// Stop an application; returns a job id.
    pub const APP_STOP: &str = "app.stop";
    /// Start an application; returns a job id.
    pub const APP_START: &str = "app.start";
    /// Query the server-side job collection.
    pub const CORE_GET_JOBS: &str = "core.get_jobs";
}

/// Messages sent from nasctl to the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Version-negotiation handshake, sent once per session before anything
    /// else.
    Connect {
        /// Preferred protocol version.
        version: String,
        /// All protocol versions the client supports.
        support: Vec<String>,
    },

    /// A correlated method call.
    Method {
        /// Correlation id, unique and strictly increasing per session.
        id: u64,
        /// Fully qualified method name, e.g. `app.get_instance`.
        method: String,
        /// Positional call arguments.
        params: Vec<Value>,
    },
}

impl ClientMessage {
    /// Build the standard `connect` handshake message.
    #[must_use]
    pub fn connect() -> Self {
        Self::Connect {
            version: PROTOCOL_VERSION.to_string(),
            support: vec![PROTOCOL_VERSION.to_string()],
        }
    }

    /// Build a correlated method call.
    #[must_use]
    pub fn method(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self::Method {
            id,
            method: method.into(),
            params,
        }
    }

    /// Serialize to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }
}

/// Messages received from the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The handshake was accepted; the channel is usable.
    Connected {
        /// Server-assigned session identifier.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<String>,
    },

    /// The handshake was rejected (unsupported protocol version).
    Failed {
        /// Version the server would have accepted.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },

    /// Response to a correlated method call.
    #[serde(rename = "result")]
    MethodResult {
        /// Correlation id matching the originating call.
        id: u64,
        /// Result payload, present on success.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        /// Error object, present on failure.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<RpcError>,
    },

    /// Anything else on the channel (pings, collection change
    /// notifications). Never a call response; always safe to skip.
    #[serde(other)]
    Other,
}

impl ServerMessage {
    /// Deserialize from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid server message.
    pub fn from_json(text: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(text).map_err(|e| ProtoError::Decoding(e.to_string()))
    }
}

/// Server-reported error on a correlated call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RpcError {
    /// Human-readable failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Alternative message field used by some endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Symbolic error name, e.g. `EINVAL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errname: Option<String>,
}

impl RpcError {
    /// The most specific non-empty description of the failure.
    #[must_use]
    pub fn text(&self) -> &str {
        for field in [&self.reason, &self.message, &self.errname] {
            if let Some(s) = field {
                if !s.is_empty() {
                    return s;
                }
            }
        }
        "unknown server error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_message_serializes_to_wire_shape() {
        let json = ClientMessage::connect().to_json().expect("should encode");
        assert!(json.contains(r#""msg":"connect""#));
        assert!(json.contains(r#""version":"1""#));
        assert!(json.contains(r#""support":["1"]"#));
    }

    #[test]
    fn method_message_carries_id_and_params() {
        let msg = ClientMessage::method(3, methods::APP_STOP, vec!["plex".into()]);
        let json = msg.to_json().expect("should encode");
        assert!(json.contains(r#""msg":"method""#));
        assert!(json.contains(r#""id":3"#));
        assert!(json.contains(r#""method":"app.stop""#));
        assert!(json.contains(r#""params":["plex"]"#));
    }

    #[test]
    fn connected_response_parses() {
        let msg = ServerMessage::from_json(r#"{"msg":"connected","session":"abc"}"#)
            .expect("should decode");
        assert_eq!(
            msg,
            ServerMessage::Connected {
                session: Some("abc".into())
            }
        );
    }

    #[test]
    fn result_response_parses_with_payload() {
        let msg = ServerMessage::from_json(r#"{"id":7,"msg":"result","result":123}"#)
            .expect("should decode");
        match msg {
            ServerMessage::MethodResult { id, result, error } => {
                assert_eq!(id, 7);
                assert_eq!(result, Some(123.into()));
                assert!(error.is_none());
            }
            other => panic!("expected result message, got {other:?}"),
        }
    }

    #[test]
    fn error_response_parses() {
        let msg = ServerMessage::from_json(
            r#"{"id":2,"msg":"result","error":{"reason":"not authenticated"}}"#,
        )
        .expect("should decode");
        match msg {
            ServerMessage::MethodResult { id, error, .. } => {
                assert_eq!(id, 2);
                assert_eq!(error.expect("error present").text(), "not authenticated");
            }
            other => panic!("expected result message, got {other:?}"),
        }
    }

    #[test]
    fn unrelated_messages_decode_as_other() {
        let msg = ServerMessage::from_json(r#"{"msg":"changed","collection":"core.get_jobs"}"#)
            .expect("should decode");
        assert_eq!(msg, ServerMessage::Other);

        let msg = ServerMessage::from_json(r#"{"msg":"pong"}"#).expect("should decode");
        assert_eq!(msg, ServerMessage::Other);
    }

    #[test]
    fn rpc_error_text_prefers_reason() {
        let err = RpcError {
            reason: Some("reason text".into()),
            message: Some("message text".into()),
            errname: None,
        };
        assert_eq!(err.text(), "reason text");
    }

    #[test]
    fn rpc_error_text_falls_back_to_message_then_errname() {
        let err = RpcError {
            reason: None,
            message: Some("message text".into()),
            errname: Some("EINVAL".into()),
        };
        assert_eq!(err.text(), "message text");

        let err = RpcError {
            reason: Some(String::new()),
            message: None,
            errname: Some("EINVAL".into()),
        };
        assert_eq!(err.text(), "EINVAL");

        assert_eq!(RpcError::default().text(), "unknown server error");
    }
}

//! Client and server message types.
//!
//! Both directions use internally tagged JSON objects (`"type": ...`).

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::identifiers::RequestId;

use super::ObjectMetadata;

// ============================================================================
// ClientMessage
// ============================================================================

/// A message from a client to the channel.
///
/// # Format
///
/// ```json
/// { "type": "init" }
/// { "type": "subscribe", "object": "backend" }
/// { "type": "unsubscribe", "object": "backend" }
/// { "type": "invokeMethod", "object": "backend", "method": "addItem", "args": ["Eggs"], "id": 7 }
/// { "type": "setProperty", "object": "backend", "property": "userName", "value": "Ada" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Client is ready and wants object metadata.
    Init,

    /// Start receiving signals of `object`.
    Subscribe {
        /// Target object name.
        object: String,
    },

    /// Stop receiving signals of `object`.
    Unsubscribe {
        /// Target object name.
        object: String,
    },

    /// Invoke a method.
    InvokeMethod {
        /// Target object name.
        object: String,
        /// Method name.
        method: String,
        /// Positional arguments.
        #[serde(default)]
        args: Vec<Value>,
        /// Correlation id for the `methodReturn` reply.
        #[serde(default)]
        id: Option<RequestId>,
    },

    /// Write a property.
    SetProperty {
        /// Target object name.
        object: String,
        /// Property name.
        property: String,
        /// New value.
        #[serde(default)]
        value: Value,
    },
}

impl ClientMessage {
    /// Returns the request id carried by this message, if any.
    #[inline]
    #[must_use]
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::InvokeMethod { id, .. } => *id,
            _ => None,
        }
    }

    /// Returns the message kind as it appears on the wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
            Self::InvokeMethod { .. } => "invokeMethod",
            Self::SetProperty { .. } => "setProperty",
        }
    }
}

// ============================================================================
// ServerMessage
// ============================================================================

/// A message from the channel to a client.
///
/// # Format
///
/// ```json
/// { "type": "init", "objects": { "backend": { ... } } }
/// { "type": "methodReturn", "id": 7, "value": null }
/// { "type": "signalEmitted", "object": "backend", "signal": "itemAdded", "args": ["Eggs"] }
/// { "type": "error", "id": 7, "code": "unknownMethod", "message": "..." }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Handshake reply with every registered object.
    Init {
        /// Metadata keyed by object name.
        objects: BTreeMap<String, ObjectMetadata>,
    },

    /// Return value of an `invokeMethod`.
    MethodReturn {
        /// The request id supplied by the client.
        id: RequestId,
        /// Returned value.
        value: Value,
    },

    /// A signal emitted by a subscribed object.
    SignalEmitted {
        /// Emitting object name.
        object: String,
        /// Signal name.
        signal: String,
        /// Signal arguments.
        args: Vec<Value>,
    },

    /// A client message could not be handled.
    Error {
        /// Request id of the failed `invokeMethod`, if any.
        id: Option<RequestId>,
        /// Stable error code (see [`Error::code`]).
        code: String,
        /// Human readable description.
        message: String,
    },
}

impl ServerMessage {
    /// Creates a `signalEmitted` message.
    #[inline]
    #[must_use]
    pub fn signal(object: impl Into<String>, signal: impl Into<String>, args: Vec<Value>) -> Self {
        Self::SignalEmitted {
            object: object.into(),
            signal: signal.into(),
            args,
        }
    }

    /// Creates an `error` message from a crate error.
    #[must_use]
    pub fn error(id: Option<RequestId>, error: &Error) -> Self {
        Self::Error {
            id,
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{from_str, json, to_value};

    #[test]
    fn test_parse_init() {
        let message: ClientMessage = from_str(r#"{"type":"init"}"#).expect("parse");
        assert_eq!(message, ClientMessage::Init);
    }

    #[test]
    fn test_parse_invoke_method() {
        let text = r#"{"type":"invokeMethod","object":"backend","method":"addItem","args":["Eggs"],"id":3}"#;
        let message: ClientMessage = from_str(text).expect("parse");

        assert_eq!(message.request_id(), Some(RequestId::new(3)));
        assert_eq!(message.kind(), "invokeMethod");
        match message {
            ClientMessage::InvokeMethod { object, method, args, .. } => {
                assert_eq!(object, "backend");
                assert_eq!(method, "addItem");
                assert_eq!(args, vec![json!("Eggs")]);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_invoke_method_defaults() {
        let text = r#"{"type":"invokeMethod","object":"backend","method":"ping"}"#;
        let message: ClientMessage = from_str(text).expect("parse");
        assert_eq!(
            message,
            ClientMessage::InvokeMethod {
                object: "backend".into(),
                method: "ping".into(),
                args: Vec::new(),
                id: None,
            }
        );
    }

    #[test]
    fn test_parse_set_property() {
        let text = r#"{"type":"setProperty","object":"backend","property":"userName","value":"Ada Lovelace"}"#;
        let message: ClientMessage = from_str(text).expect("parse");
        assert_eq!(
            message,
            ClientMessage::SetProperty {
                object: "backend".into(),
                property: "userName".into(),
                value: json!("Ada Lovelace"),
            }
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(from_str::<ClientMessage>(r#"{"type":"explode"}"#).is_err());
        assert!(from_str::<ClientMessage>(r#"{"object":"backend"}"#).is_err());
    }

    #[test]
    fn test_signal_format() {
        let message = ServerMessage::signal("backend", "itemAdded", vec![json!("Eggs")]);
        assert_eq!(
            to_value(&message).expect("serialize"),
            json!({
                "type": "signalEmitted",
                "object": "backend",
                "signal": "itemAdded",
                "args": ["Eggs"],
            })
        );
    }

    #[test]
    fn test_method_return_format() {
        let message = ServerMessage::MethodReturn {
            id: RequestId::new(9),
            value: json!(4),
        };
        assert_eq!(
            to_value(&message).expect("serialize"),
            json!({ "type": "methodReturn", "id": 9, "value": 4 })
        );
    }

    #[test]
    fn test_error_format() {
        let err = Error::unknown_method("backend", "explode");
        let message = ServerMessage::error(Some(RequestId::new(1)), &err);
        assert_eq!(
            to_value(&message).expect("serialize"),
            json!({
                "type": "error",
                "id": 1,
                "code": "unknownMethod",
                "message": "Unknown method: backend.explode",
            })
        );
    }
}

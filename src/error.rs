//! Error types for the web channel.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use webchannel::{Channel, Result};
//!
//! fn register(channel: &Channel, table: ObjectTable) -> Result<()> {
//!     channel.register_object("backend", table)?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | Handling |
//! |----------|----------|----------|
//! | Startup | [`Error::Config`], [`Error::DuplicateName`], [`Error::Bind`] | Fatal |
//! | Client | [`Error::UnknownObject`], [`Error::UnknownMethod`], [`Error::UnknownProperty`], [`Error::NotWritable`], [`Error::InvalidArgument`], [`Error::Protocol`] | Reported to the session |
//! | Session | [`Error::SessionNotFound`], [`Error::Connection`], [`Error::ConnectionClosed`] | Session torn down |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] | Depends on origin |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::net::SocketAddr;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::SessionId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Startup Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the demo configuration or an object table is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// An object with this name is already registered.
    #[error("Object already registered: {name}")]
    DuplicateName {
        /// The conflicting object name.
        name: String,
    },

    /// Failed to bind a listening socket.
    ///
    /// Usually means the port is already in use.
    #[error("Failed to listen on {addr}: {source}")]
    Bind {
        /// Address the listener tried to bind.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: IoError,
    },

    // ========================================================================
    // Client Errors
    // ========================================================================
    /// No object registered under the requested name.
    #[error("Unknown object: {object}")]
    UnknownObject {
        /// The requested object name.
        object: String,
    },

    /// The object has no method with the requested name.
    #[error("Unknown method: {object}.{method}")]
    UnknownMethod {
        /// Target object.
        object: String,
        /// The requested method name.
        method: String,
    },

    /// The object has no property with the requested name.
    #[error("Unknown property: {object}.{property}")]
    UnknownProperty {
        /// Target object.
        object: String,
        /// The requested property name.
        property: String,
    },

    /// The property exists but is read-only.
    #[error("Property is not writable: {object}.{property}")]
    NotWritable {
        /// Target object.
        object: String,
        /// The read-only property.
        property: String,
    },

    /// Invalid argument passed to a method or property.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// Protocol violation or malformed message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// Session is not attached to the channel.
    #[error("Session not found: {session_id}")]
    SessionNotFound {
        /// The missing session.
        session_id: SessionId,
    },

    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a duplicate name error.
    #[inline]
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    /// Creates a bind error.
    #[inline]
    pub fn bind(addr: SocketAddr, source: IoError) -> Self {
        Self::Bind { addr, source }
    }

    /// Creates an unknown object error.
    #[inline]
    pub fn unknown_object(object: impl Into<String>) -> Self {
        Self::UnknownObject {
            object: object.into(),
        }
    }

    /// Creates an unknown method error.
    #[inline]
    pub fn unknown_method(object: impl Into<String>, method: impl Into<String>) -> Self {
        Self::UnknownMethod {
            object: object.into(),
            method: method.into(),
        }
    }

    /// Creates an unknown property error.
    #[inline]
    pub fn unknown_property(object: impl Into<String>, property: impl Into<String>) -> Self {
        Self::UnknownProperty {
            object: object.into(),
            property: property.into(),
        }
    }

    /// Creates a not writable error.
    #[inline]
    pub fn not_writable(object: impl Into<String>, property: impl Into<String>) -> Self {
        Self::NotWritable {
            object: object.into(),
            property: property.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a session not found error.
    #[inline]
    pub fn session_not_found(session_id: SessionId) -> Self {
        Self::SessionNotFound { session_id }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns the stable code sent to clients in `error` messages.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::DuplicateName { .. } => "duplicateName",
            Self::Bind { .. } => "bind",
            Self::UnknownObject { .. } => "unknownObject",
            Self::UnknownMethod { .. } => "unknownMethod",
            Self::UnknownProperty { .. } => "unknownProperty",
            Self::NotWritable { .. } => "notWritable",
            Self::InvalidArgument { .. } => "invalidArgument",
            Self::Protocol { .. } | Self::Json(_) => "protocol",
            Self::SessionNotFound { .. } => "sessionNotFound",
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_) => "connection",
            Self::Io(_) => "io",
        }
    }

    /// Returns `true` if this error is caused by a client message.
    ///
    /// Client errors are reported back to the originating session and
    /// leave the connection open.
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownObject { .. }
                | Self::UnknownMethod { .. }
                | Self::UnknownProperty { .. }
                | Self::NotWritable { .. }
                | Self::InvalidArgument { .. }
                | Self::Protocol { .. }
                | Self::Json(_)
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::SessionNotFound { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error should abort process startup.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::DuplicateName { .. } | Self::Bind { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

//! WebSocket transport layer.
//!
//! This module accepts client connections and wraps each one into a
//! message-oriented session attached to the [`Channel`](crate::Channel).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Browser        │         WebSocket            │  Rust           │
//! │                 │◄────────────────────────────►│ WebSocketServer │
//! │  channel proxy  │        0.0.0.0:8001          │  → session loop │
//! │                 │                              │  → Channel      │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `WebSocketServer::bind` - Bind the listening socket
//! 2. `WebSocketServer::serve` - Accept TCP connections, upgrade to WebSocket
//! 3. `serve_session` - Attach a session, pump messages both ways
//! 4. Close from either side detaches the session
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Per-session event loop |
//! | `server` | Listener and accept loop |

// ============================================================================
// Submodules
// ============================================================================

/// Per-session WebSocket event loop.
pub mod connection;

/// WebSocket listener for channel clients.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::serve_session;
pub use server::WebSocketServer;

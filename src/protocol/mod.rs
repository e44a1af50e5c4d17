//! WebSocket protocol message types.
//!
//! This module defines the JSON messages exchanged between a client proxy
//! (browser) and the channel (Rust). Every message is a JSON object whose
//! `type` field selects the variant.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | `init` | Client → Server | Client ready, requests object metadata |
//! | `subscribe` / `unsubscribe` | Client → Server | Toggle signal delivery for an object |
//! | `invokeMethod` | Client → Server | Call a method, optionally correlated by `id` |
//! | `setProperty` | Client → Server | Write a property |
//! | `init` | Server → Client | Metadata of every registered object |
//! | `methodReturn` | Server → Client | Return value of a method call |
//! | `signalEmitted` | Server → Client | Signal from a subscribed object |
//! | `error` | Server → Client | Per-message failure |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Client and server message enums |
//! | `metadata` | Object metadata sent in the `init` reply |

// ============================================================================
// Submodules
// ============================================================================

/// Client and server message enums.
pub mod message;

/// Object metadata for the handshake.
pub mod metadata;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{ClientMessage, ServerMessage};
pub use metadata::ObjectMetadata;

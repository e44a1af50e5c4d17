//! WebChannel - Remote object synchronization over WebSocket.
//!
//! This library exposes server-side objects to browser clients. Clients see
//! a mirror of each object's properties, call its methods, write its
//! properties and receive its signals as they are emitted.
//!
//! # Architecture
//!
//! - **Server (Rust)**: Owns the objects; every mutation happens here
//! - **Client (Browser)**: Holds a metadata mirror, forwards calls
//!
//! Key design principles:
//!
//! - Objects are described by explicit descriptor tables, no reflection
//! - Each session has one ordered outbound queue for replies and signals
//! - Signals reach only sessions subscribed to the emitting object
//! - A session too slow to drain its queue is disconnected
//!
//! # Quick Start
//!
//! ```no_run
//! use webchannel::{Demo, DemoConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = DemoConfig::builder().assets_root("./assets").build()?;
//!     let handle = Demo::start(config).await?;
//!
//!     handle.backend().add_item("Eggs");
//!
//!     tokio::signal::ctrl_c().await?;
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`app`] | Process wiring: [`Demo`], [`DemoHandle`] |
//! | [`backend`] | The shopping list [`Backend`] object |
//! | [`channel`] | [`Channel`] routing and the session hub |
//! | [`config`] | [`DemoConfig`] and its builder |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`http`] | Static asset server |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`object`] | Descriptor tables and the signal sink |
//! | [`protocol`] | WebSocket message types |
//! | [`transport`] | WebSocket listener and session loop |

// ============================================================================
// Modules
// ============================================================================

/// Process wiring for the demo.
pub mod app;

/// The shopping list backend object.
pub mod backend;

/// Synchronization channel.
///
/// Use [`Channel::register_object`] to expose an object, then attach
/// sessions through the [`transport`] layer.
pub mod channel;

/// Demo configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Static asset HTTP server.
pub mod http;

/// Type-safe identifiers.
pub mod identifiers;

/// Descriptor tables for registered objects.
pub mod object;

/// WebSocket protocol message types.
pub mod protocol;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Process
pub use app::{Demo, DemoHandle};
pub use config::{DemoConfig, DemoConfigBuilder};

// Objects
pub use backend::Backend;
pub use object::{MethodDescriptor, NotifySink, ObjectTable, PropertyDescriptor};

// Channel
pub use channel::{Channel, SessionState};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{RequestId, SessionId};

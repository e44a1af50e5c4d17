//! Synchronization channel.
//!
//! The channel maps object names to descriptor tables and, per connected
//! client, tracks which objects the client subscribed to. It turns client
//! messages into method calls and property writes, and fans signals out to
//! subscribed sessions.
//!
//! # Architecture
//!
//! ```text
//!  transport ──text──► Channel::dispatch ──► ObjectTable handlers
//!      ▲                    │                      │
//!      │              replies│                      │ publish
//!      │                    ▼                      ▼
//!      └──outbound queue── SessionHub ◄──── NotifySink
//! ```
//!
//! Every message for a session, whether a reply or a signal, goes through
//! that session's bounded outbound queue, so a session observes replies and
//! signals in the order they were produced.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`Channel`]: registry and message dispatch |
//! | `hub` | [`SessionHub`]: sessions, subscriptions, fan-out |
//! | `session` | [`SessionState`] lifecycle |

// ============================================================================
// Submodules
// ============================================================================

/// Registry and message dispatch.
pub mod core;

/// Session registry and signal fan-out.
pub mod hub;

/// Per-client session state.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::Channel;
pub use hub::SessionHub;
pub use session::{DEFAULT_QUEUE_CAPACITY, SessionState};

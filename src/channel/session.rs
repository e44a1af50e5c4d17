//! Per-client session state.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::sync::mpsc;

use crate::protocol::ServerMessage;

// ============================================================================
// Constants
// ============================================================================

/// Default capacity of a session's outbound queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

// ============================================================================
// SessionState
// ============================================================================

/// Lifecycle of a client session.
///
/// ```text
/// Connecting ──attach──► AwaitingInit ──init──► Active
///      │                      │                   │
///      └──────────────────────┴───────────────────┴──close/error──► Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport accepted, not yet attached to the channel.
    Connecting,
    /// Attached; waiting for the client's `init`.
    AwaitingInit,
    /// Handshake done; all message kinds accepted.
    Active,
    /// Torn down. Terminal.
    ///
    /// The hub forgets a session once it closes; [`Channel::session_state`]
    /// reports this state for any session it no longer tracks.
    ///
    /// [`Channel::session_state`]: super::Channel::session_state
    Closed,
}

impl SessionState {
    /// Returns `true` if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::AwaitingInit)
                | (Self::AwaitingInit, Self::Active)
                | (Self::Active, Self::Active)
                | (Self::Connecting | Self::AwaitingInit | Self::Active, Self::Closed)
        )
    }

    /// Returns `true` once the init handshake has completed.
    #[inline]
    #[must_use]
    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::AwaitingInit => "awaiting-init",
            Self::Active => "active",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Session
// ============================================================================

/// A client session as seen by the hub.
///
/// Owns the sending half of the session's outbound queue; dropping the
/// session closes the queue and ends the transport's event loop.
#[derive(Debug)]
pub(crate) struct Session {
    /// Outbound queue to the transport.
    pub(crate) outbound: mpsc::Sender<ServerMessage>,
    /// Current lifecycle state.
    pub(crate) state: SessionState,
    /// Subscribed object names, in subscription order.
    pub(crate) subscriptions: Vec<String>,
}

impl Session {
    /// Creates a session in the `Connecting` state.
    pub(crate) fn new(outbound: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            outbound,
            state: SessionState::Connecting,
            subscriptions: Vec::new(),
        }
    }

    /// Moves to `next` if the transition is legal.
    ///
    /// Returns `false` and leaves the state unchanged otherwise.
    pub(crate) fn advance(&mut self, next: SessionState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let (tx, _rx) = mpsc::channel(1);
        let mut session = Session::new(tx);

        assert_eq!(session.state, SessionState::Connecting);
        assert!(session.advance(SessionState::AwaitingInit));
        assert!(session.advance(SessionState::Active));
        assert!(session.state.is_active());
        assert!(session.advance(SessionState::Closed));
    }

    #[test]
    fn test_cannot_skip_handshake() {
        let (tx, _rx) = mpsc::channel(1);
        let mut session = Session::new(tx);

        assert!(!session.advance(SessionState::Active));
        assert_eq!(session.state, SessionState::Connecting);
    }

    #[test]
    fn test_closed_is_terminal() {
        for next in [
            SessionState::Connecting,
            SessionState::AwaitingInit,
            SessionState::Active,
            SessionState::Closed,
        ] {
            assert!(!SessionState::Closed.can_transition_to(next));
        }
    }

    #[test]
    fn test_reinit_keeps_active() {
        assert!(SessionState::Active.can_transition_to(SessionState::Active));
        assert!(!SessionState::AwaitingInit.can_transition_to(SessionState::AwaitingInit));
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionState::AwaitingInit.to_string(), "awaiting-init");
    }
}

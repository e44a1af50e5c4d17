//! Session registry and signal fan-out.
//!
//! The hub owns every attached [`Session`] and the per-object subscriber
//! lists. It implements [`NotifySink`], so domain objects publish straight
//! into it.
//!
//! # Delivery Policy
//!
//! Messages are pushed with `try_send` and the hub never awaits. A session
//! whose outbound queue is full or closed is evicted: it is removed from
//! every subscriber list and its queue sender is dropped, which ends the
//! transport's event loop and closes the socket. Other sessions are not
//! affected.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::object::NotifySink;
use crate::protocol::ServerMessage;

use super::session::{Session, SessionState};

// ============================================================================
// HubState
// ============================================================================

/// State guarded by the hub lock.
#[derive(Debug, Default)]
struct HubState {
    /// Attached sessions.
    sessions: FxHashMap<SessionId, Session>,
    /// Subscribed sessions per object, in subscription order.
    subscribers: FxHashMap<String, Vec<SessionId>>,
    /// Signals each registered object may publish.
    declared: FxHashMap<String, Vec<String>>,
}

impl HubState {
    /// Removes a session and all of its subscriptions.
    fn remove(&mut self, session_id: SessionId) -> Option<Session> {
        let session = self.sessions.remove(&session_id)?;

        for object in &session.subscriptions {
            if let Some(list) = self.subscribers.get_mut(object) {
                list.retain(|id| *id != session_id);
            }
        }

        Some(session)
    }

    fn session_mut(&mut self, session_id: SessionId) -> Result<&mut Session> {
        self.sessions
            .get_mut(&session_id)
            .ok_or_else(|| Error::session_not_found(session_id))
    }
}

// ============================================================================
// SessionHub
// ============================================================================

/// Registry of attached sessions and their subscriptions.
///
/// Thread-safe; all operations are synchronous and non-blocking.
#[derive(Debug)]
pub struct SessionHub {
    /// Sessions and subscriber lists.
    state: Mutex<HubState>,
    /// Capacity of each new session's outbound queue.
    queue_capacity: usize,
}

impl SessionHub {
    /// Creates an empty hub.
    ///
    /// A zero capacity is raised to 1.
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            state: Mutex::new(HubState::default()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Attaches a new session.
    ///
    /// The session starts in [`SessionState::AwaitingInit`]. The returned
    /// receiver yields every message destined for the session and ends when
    /// the session is detached or evicted.
    pub fn attach(&self) -> (SessionId, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let session_id = SessionId::next();

        let mut session = Session::new(tx);
        session.advance(SessionState::AwaitingInit);
        self.state.lock().sessions.insert(session_id, session);

        debug!(session_id = %session_id, "Session attached");
        (session_id, rx)
    }

    /// Detaches a session, dropping its subscriptions.
    ///
    /// Returns `false` if the session was not attached (already evicted).
    pub fn detach(&self, session_id: SessionId) -> bool {
        let removed = self.state.lock().remove(session_id);
        if removed.is_some() {
            debug!(session_id = %session_id, "Session detached");
        }
        removed.is_some()
    }

    /// Completes the init handshake for a session.
    ///
    /// Idempotent for sessions that are already active.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionNotFound`] if the session is not attached
    /// - [`Error::Protocol`] if the session cannot become active
    pub fn activate(&self, session_id: SessionId) -> Result<()> {
        let mut state = self.state.lock();
        let session = state.session_mut(session_id)?;

        if session.advance(SessionState::Active) {
            Ok(())
        } else {
            Err(Error::protocol(format!(
                "Cannot complete handshake from state {}",
                session.state
            )))
        }
    }

    /// Returns the state of a session, or `None` if it is not attached.
    ///
    /// Detached sessions are dropped from the hub, so a closed session
    /// reads as `None` here.
    #[must_use]
    pub fn session_state(&self, session_id: SessionId) -> Option<SessionState> {
        self.state
            .lock()
            .sessions
            .get(&session_id)
            .map(|session| session.state)
    }

    /// Subscribes a session to an object's signals.
    ///
    /// Subscribing twice has no further effect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if the session is not attached.
    pub fn subscribe(&self, session_id: SessionId, object: &str) -> Result<()> {
        let mut state = self.state.lock();
        let session = state.session_mut(session_id)?;

        if session.subscriptions.iter().any(|o| o == object) {
            return Ok(());
        }
        session.subscriptions.push(object.to_string());

        state
            .subscribers
            .entry(object.to_string())
            .or_default()
            .push(session_id);

        debug!(session_id = %session_id, object, "Subscribed");
        Ok(())
    }

    /// Unsubscribes a session from an object's signals.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if the session is not attached.
    pub fn unsubscribe(&self, session_id: SessionId, object: &str) -> Result<()> {
        let mut state = self.state.lock();
        let session = state.session_mut(session_id)?;
        session.subscriptions.retain(|o| o != object);

        if let Some(list) = state.subscribers.get_mut(object) {
            list.retain(|id| *id != session_id);
        }

        debug!(session_id = %session_id, object, "Unsubscribed");
        Ok(())
    }

    /// Returns `true` if the session is subscribed to `object`.
    #[must_use]
    pub fn is_subscribed(&self, session_id: SessionId, object: &str) -> bool {
        self.state
            .lock()
            .sessions
            .get(&session_id)
            .is_some_and(|session| session.subscriptions.iter().any(|o| o == object))
    }

    /// Queues a message for one session.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionNotFound`] if the session is not attached
    /// - [`Error::ConnectionClosed`] if the queue was full or closed; the
    ///   session has been evicted
    pub fn send_to(&self, session_id: SessionId, message: ServerMessage) -> Result<()> {
        let mut state = self.state.lock();
        let session = state.session_mut(session_id)?;

        match session.outbound.try_send(message) {
            Ok(()) => Ok(()),
            Err(e) => {
                Self::log_eviction(session_id, &e);
                state.remove(session_id);
                Err(Error::ConnectionClosed)
            }
        }
    }

    /// Queues a message for every session subscribed to `object`.
    ///
    /// Sessions are visited in subscription order. Returns the number of
    /// sessions the message was queued for.
    pub fn broadcast(&self, object: &str, message: &ServerMessage) -> usize {
        let mut state = self.state.lock();

        let Some(subscribers) = state.subscribers.get(object) else {
            return 0;
        };

        let mut delivered = 0;
        let mut evicted = Vec::new();

        for session_id in subscribers {
            let Some(session) = state.sessions.get(session_id) else {
                continue;
            };

            match session.outbound.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    Self::log_eviction(*session_id, &e);
                    evicted.push(*session_id);
                }
            }
        }

        for session_id in evicted {
            state.remove(session_id);
        }

        trace!(object, delivered, "Broadcast");
        delivered
    }

    /// Records the signals `object` may publish.
    ///
    /// Once declared, [`NotifySink::publish`] drops any other signal of that
    /// object. Objects that never declare are not checked.
    pub fn declare_signals(&self, object: &str, signals: &[String]) {
        self.state
            .lock()
            .declared
            .insert(object.to_string(), signals.to_vec());
    }

    /// Returns `true` unless `object` declared its signals and `signal` is
    /// not among them.
    #[must_use]
    pub fn is_declared(&self, object: &str, signal: &str) -> bool {
        self.state
            .lock()
            .declared
            .get(object)
            .is_none_or(|signals| signals.iter().any(|s| s == signal))
    }

    /// Returns the number of attached sessions.
    #[inline]
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.state.lock().sessions.len()
    }

    /// Returns the number of sessions subscribed to `object`.
    #[must_use]
    pub fn subscriber_count(&self, object: &str) -> usize {
        self.state
            .lock()
            .subscribers
            .get(object)
            .map_or(0, Vec::len)
    }

    /// Detaches every session.
    ///
    /// Each transport event loop observes its closed queue and closes its
    /// socket.
    pub fn close_all(&self) {
        let sessions: Vec<_> = {
            let mut state = self.state.lock();
            state.subscribers.clear();
            state.sessions.drain().collect()
        };

        if !sessions.is_empty() {
            debug!(count = sessions.len(), "Closed all sessions");
        }
    }

    fn log_eviction(session_id: SessionId, error: &TrySendError<ServerMessage>) {
        match error {
            TrySendError::Full(_) => {
                warn!(session_id = %session_id, "Outbound queue full, evicting session");
            }
            TrySendError::Closed(_) => {
                debug!(session_id = %session_id, "Outbound queue closed, evicting session");
            }
        }
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new(super::session::DEFAULT_QUEUE_CAPACITY)
    }
}

impl NotifySink for SessionHub {
    fn publish(&self, object: &str, signal: &str, args: Vec<Value>) {
        if !self.is_declared(object, signal) {
            warn!(object, signal, "Dropping undeclared signal");
            return;
        }

        let message = ServerMessage::signal(object, signal, args);
        self.broadcast(object, &message);
    }
}

// ============================================================================
// Tests
// ============================================================================

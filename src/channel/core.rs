//! The synchronization channel.
//!
//! Owns the object registry and the [`SessionHub`], parses client messages
//! and routes them to object tables.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::{Value, from_str};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::{RequestId, SessionId};
use crate::object::{NotifySink, ObjectTable};
use crate::protocol::{ClientMessage, ObjectMetadata, ServerMessage};

use super::hub::SessionHub;
use super::session::{DEFAULT_QUEUE_CAPACITY, SessionState};

// ============================================================================
// Channel
// ============================================================================

/// Routes messages between client sessions and registered objects.
///
/// # Example
///
/// ```ignore
/// let channel = Arc::new(Channel::new());
/// let backend = Backend::new(channel.notifier());
/// channel.register_object("backend", backend.object_table()?)?;
///
/// let (session_id, mut outbound) = channel.attach();
/// channel.dispatch(session_id, r#"{"type":"init"}"#);
/// let reply = outbound.recv().await;
/// ```
pub struct Channel {
    /// Registered objects by name.
    objects: RwLock<FxHashMap<String, Arc<ObjectTable>>>,
    /// Attached sessions and subscriptions.
    hub: Arc<SessionHub>,
}

// ============================================================================
// Channel - Constructor
// ============================================================================

impl Channel {
    /// Creates an empty channel with the default outbound queue capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Creates an empty channel with a custom outbound queue capacity.
    #[must_use]
    pub fn with_queue_capacity(capacity: usize) -> Self {
        Self {
            objects: RwLock::new(FxHashMap::default()),
            hub: Arc::new(SessionHub::new(capacity)),
        }
    }

    /// Returns the sink registered objects publish their signals into.
    #[inline]
    #[must_use]
    pub fn notifier(&self) -> Arc<dyn NotifySink> {
        Arc::clone(&self.hub) as Arc<dyn NotifySink>
    }

    /// Returns the session hub.
    #[inline]
    #[must_use]
    pub fn hub(&self) -> &SessionHub {
        &self.hub
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Channel - Registry
// ============================================================================

impl Channel {
    /// Registers an object under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateName`] if the name is already taken.
    pub fn register_object(&self, name: impl Into<String>, table: ObjectTable) -> Result<()> {
        let name = name.into();
        let mut objects = self.objects.write();

        if objects.contains_key(&name) {
            return Err(Error::duplicate_name(name));
        }

        self.hub.declare_signals(&name, table.signals());
        info!(object = %name, "Object registered");
        objects.insert(name, Arc::new(table));
        Ok(())
    }

    /// Returns the registered object names, sorted.
    #[must_use]
    pub fn object_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.objects.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshots the metadata of every registered object.
    #[must_use]
    pub fn metadata(&self) -> BTreeMap<String, ObjectMetadata> {
        let tables: Vec<_> = self
            .objects
            .read()
            .iter()
            .map(|(name, table)| (name.clone(), Arc::clone(table)))
            .collect();

        // Getters may take object locks; read them outside the registry lock.
        tables
            .into_iter()
            .map(|(name, table)| (name, table.metadata()))
            .collect()
    }

    fn lookup(&self, object: &str) -> Result<Arc<ObjectTable>> {
        self.objects
            .read()
            .get(object)
            .cloned()
            .ok_or_else(|| Error::unknown_object(object))
    }
}

// ============================================================================
// Channel - Sessions
// ============================================================================

impl Channel {
    /// Attaches a new client session.
    ///
    /// The returned receiver carries every message for the session; the
    /// transport forwards it to the client.
    pub fn attach(&self) -> (SessionId, mpsc::Receiver<ServerMessage>) {
        self.hub.attach()
    }

    /// Detaches a session and drops its subscriptions.
    pub fn detach(&self, session_id: SessionId) {
        self.hub.detach(session_id);
    }

    /// Returns the state of a session.
    ///
    /// A session that was detached, evicted or never attached is
    /// [`SessionState::Closed`].
    #[must_use]
    pub fn session_state(&self, session_id: SessionId) -> SessionState {
        self.hub
            .session_state(session_id)
            .unwrap_or(SessionState::Closed)
    }

    /// Detaches every session.
    pub fn close_all(&self) {
        self.hub.close_all();
    }

    /// Handles one raw text message from a session.
    ///
    /// Replies and errors are queued on the session's outbound queue.
    /// Returns once the message is fully applied, including any signals it
    /// caused.
    pub fn dispatch(&self, session_id: SessionId, text: &str) {
        let message = match from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Malformed client message");
                let err = Error::protocol(format!("Malformed message: {e}"));
                self.reply(session_id, ServerMessage::error(None, &err));
                return;
            }
        };

        self.dispatch_message(session_id, message);
    }

    /// Handles one parsed message from a session.
    pub fn dispatch_message(&self, session_id: SessionId, message: ClientMessage) {
        let request_id = message.request_id();
        let kind = message.kind();

        debug!(session_id = %session_id, kind, "Client message");

        if let Err(e) = self.handle(session_id, message) {
            if e.is_connection_error() {
                debug!(session_id = %session_id, error = %e, "Session gone");
                return;
            }
            debug!(session_id = %session_id, kind, error = %e, "Client message failed");
            self.reply(session_id, ServerMessage::error(request_id, &e));
        }
    }

    fn handle(&self, session_id: SessionId, message: ClientMessage) -> Result<()> {
        if let ClientMessage::Init = message {
            self.hub.activate(session_id)?;
            let objects = self.metadata();
            info!(session_id = %session_id, "Handshake completed");
            return self.hub.send_to(session_id, ServerMessage::Init { objects });
        }

        match self.hub.session_state(session_id) {
            Some(SessionState::Active) => {}
            Some(state) => {
                return Err(Error::protocol(format!(
                    "Expected init before {}, session is {state}",
                    message.kind()
                )));
            }
            None => return Err(Error::session_not_found(session_id)),
        }

        match message {
            ClientMessage::Init => Ok(()),

            ClientMessage::Subscribe { object } => {
                self.lookup(&object)?;
                self.hub.subscribe(session_id, &object)
            }

            ClientMessage::Unsubscribe { object } => {
                self.lookup(&object)?;
                self.hub.unsubscribe(session_id, &object)
            }

            ClientMessage::InvokeMethod {
                object,
                method,
                args,
                id,
            } => self.invoke_method(session_id, &object, &method, &args, id),

            ClientMessage::SetProperty {
                object,
                property,
                value,
            } => self.set_property(&object, &property, value),
        }
    }

    fn invoke_method(
        &self,
        session_id: SessionId,
        object: &str,
        method: &str,
        args: &[Value],
        id: Option<RequestId>,
    ) -> Result<()> {
        let table = self.lookup(object)?;
        let descriptor = table
            .method(method)
            .ok_or_else(|| Error::unknown_method(object, method))?;

        let value = descriptor.invoke(args)?;

        if descriptor.returns_value()
            && let Some(id) = id
        {
            self.hub
                .send_to(session_id, ServerMessage::MethodReturn { id, value })?;
        }

        Ok(())
    }

    fn set_property(&self, object: &str, property: &str, value: Value) -> Result<()> {
        let table = self.lookup(object)?;
        let descriptor = table
            .property(property)
            .ok_or_else(|| Error::unknown_property(object, property))?;

        // The object applies the value, then publishes its notify signal.
        if descriptor.write(value)? {
            Ok(())
        } else {
            Err(Error::not_writable(object, property))
        }
    }

    fn reply(&self, session_id: SessionId, message: ServerMessage) {
        if let Err(e) = self.hub.send_to(session_id, message) {
            debug!(session_id = %session_id, error = %e, "Reply dropped");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use serde_json::json;

    use crate::object::{MethodDescriptor, PropertyDescriptor};

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// A small object with a value-returning method and a read-only property.
    fn calculator(channel: &Channel) -> Arc<Mutex<i64>> {
        let total = Arc::new(Mutex::new(0_i64));
        let add_total = Arc::clone(&total);
        let read_total = Arc::clone(&total);
        let sink = channel.notifier();

        let table = ObjectTable::builder()
            .property(PropertyDescriptor::read_only("total", move || {
                json!(*read_total.lock())
            }))
            .method(
                MethodDescriptor::new("add", move |args| {
                    let n = args
                        .first()
                        .and_then(Value::as_i64)
                        .ok_or_else(|| Error::invalid_argument("add expects an integer"))?;
                    let mut total = add_total.lock();
                    *total += n;
                    sink.publish("calc", "totalChanged", vec![json!(*total)]);
                    Ok(json!(*total))
                })
                .returning(),
            )
            .signal("totalChanged")
            .build()
            .expect("valid table");

        channel.register_object("calc", table).expect("register");
        total
    }

    fn active_session(channel: &Channel) -> (SessionId, mpsc::Receiver<ServerMessage>) {
        let (id, mut rx) = channel.attach();
        channel.dispatch(id, r#"{"type":"init"}"#);
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [ServerMessage::Init { .. }]
        ));
        (id, rx)
    }

    fn error_code(message: &ServerMessage) -> &str {
        match message {
            ServerMessage::Error { code, .. } => code,
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_registration() {
        let channel = Channel::new();
        let table = || ObjectTable::builder().build().expect("table");

        channel.register_object("a", table()).expect("first");
        let err = channel.register_object("a", table()).unwrap_err();
        assert!(matches!(err, Error::DuplicateName { .. }));
        assert_eq!(channel.object_names(), vec!["a".to_string()]);
    }

    #[test]
    fn test_init_returns_metadata() {
        let channel = Channel::new();
        calculator(&channel);
        let (id, mut rx) = channel.attach();

        channel.dispatch(id, r#"{"type":"init"}"#);

        let messages = drain(&mut rx);
        let ServerMessage::Init { objects } = &messages[0] else {
            panic!("expected init, got {messages:?}");
        };
        assert_eq!(objects["calc"].properties["total"], json!(0));
        assert_eq!(objects["calc"].methods, vec!["add".to_string()]);
        assert_eq!(objects["calc"].signals, vec!["totalChanged".to_string()]);
        assert_eq!(channel.session_state(id), SessionState::Active);
    }

    #[test]
    fn test_messages_before_init_are_rejected() {
        let channel = Channel::new();
        let total = calculator(&channel);
        let (id, mut rx) = channel.attach();

        channel.dispatch(
            id,
            r#"{"type":"invokeMethod","object":"calc","method":"add","args":[1],"id":1}"#,
        );

        let messages = drain(&mut rx);
        assert_eq!(error_code(&messages[0]), "protocol");
        assert_eq!(*total.lock(), 0);
    }

    #[test]
    fn test_method_return_correlated_by_id() {
        let channel = Channel::new();
        calculator(&channel);
        let (id, mut rx) = active_session(&channel);

        channel.dispatch(
            id,
            r#"{"type":"invokeMethod","object":"calc","method":"add","args":[5],"id":42}"#,
        );

        assert_eq!(
            drain(&mut rx),
            vec![ServerMessage::MethodReturn {
                id: RequestId::new(42),
                value: json!(5),
            }]
        );
    }

    #[test]
    fn test_method_without_id_sends_no_return() {
        let channel = Channel::new();
        let total = calculator(&channel);
        let (id, mut rx) = active_session(&channel);

        channel.dispatch(
            id,
            r#"{"type":"invokeMethod","object":"calc","method":"add","args":[2]}"#,
        );

        assert!(drain(&mut rx).is_empty());
        assert_eq!(*total.lock(), 2);
    }

    #[test]
    fn test_unknown_object_and_method() {
        let channel = Channel::new();
        let total = calculator(&channel);
        let (id, mut rx) = active_session(&channel);

        channel.dispatch(
            id,
            r#"{"type":"invokeMethod","object":"nope","method":"add","args":[1],"id":1}"#,
        );
        channel.dispatch(
            id,
            r#"{"type":"invokeMethod","object":"calc","method":"explode","args":[],"id":2}"#,
        );

        let messages = drain(&mut rx);
        assert_eq!(error_code(&messages[0]), "unknownObject");
        assert_eq!(error_code(&messages[1]), "unknownMethod");
        assert!(matches!(
            messages[1],
            ServerMessage::Error { id: Some(id), .. } if id == RequestId::new(2)
        ));
        assert_eq!(*total.lock(), 0);
    }

    #[test]
    fn test_set_property_errors() {
        let channel = Channel::new();
        calculator(&channel);
        let (id, mut rx) = active_session(&channel);

        channel.dispatch(
            id,
            r#"{"type":"setProperty","object":"calc","property":"missing","value":1}"#,
        );
        channel.dispatch(
            id,
            r#"{"type":"setProperty","object":"calc","property":"total","value":1}"#,
        );

        let messages = drain(&mut rx);
        assert_eq!(error_code(&messages[0]), "unknownProperty");
        assert_eq!(error_code(&messages[1]), "notWritable");
    }

    #[test]
    fn test_subscribe_unknown_object() {
        let channel = Channel::new();
        let (id, mut rx) = active_session(&channel);

        channel.dispatch(id, r#"{"type":"subscribe","object":"ghost"}"#);
        assert_eq!(error_code(&drain(&mut rx)[0]), "unknownObject");
    }

    #[test]
    fn test_malformed_message_keeps_session() {
        let channel = Channel::new();
        let (id, mut rx) = active_session(&channel);

        channel.dispatch(id, "not json");
        channel.dispatch(id, r#"{"type":"teleport"}"#);

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 2);
        assert_eq!(error_code(&messages[0]), "protocol");
        assert_eq!(error_code(&messages[1]), "protocol");
        assert_eq!(channel.session_state(id), SessionState::Active);
    }

    #[test]
    fn test_signals_follow_subscription() {
        let channel = Channel::new();
        calculator(&channel);
        let (caller, mut caller_rx) = active_session(&channel);
        let (watcher, mut watcher_rx) = active_session(&channel);
        let (_idle, mut idle_rx) = active_session(&channel);

        channel.dispatch(watcher, r#"{"type":"subscribe","object":"calc"}"#);
        channel.dispatch(
            caller,
            r#"{"type":"invokeMethod","object":"calc","method":"add","args":[3],"id":1}"#,
        );

        assert_eq!(
            drain(&mut watcher_rx),
            vec![ServerMessage::signal("calc", "totalChanged", vec![json!(3)])]
        );
        assert!(idle_rx.try_recv().is_err());
        assert_eq!(drain(&mut caller_rx).len(), 1);

        channel.dispatch(watcher, r#"{"type":"unsubscribe","object":"calc"}"#);
        channel.dispatch(
            caller,
            r#"{"type":"invokeMethod","object":"calc","method":"add","args":[1]}"#,
        );
        assert!(drain(&mut watcher_rx).is_empty());
    }

    #[test]
    fn test_detach_drops_subscriptions() {
        let channel = Channel::new();
        calculator(&channel);
        let (id, _rx) = active_session(&channel);

        channel.dispatch(id, r#"{"type":"subscribe","object":"calc"}"#);
        assert_eq!(channel.hub().subscriber_count("calc"), 1);

        channel.detach(id);
        assert_eq!(channel.hub().subscriber_count("calc"), 0);
        assert_eq!(channel.session_state(id), SessionState::Closed);
    }

    #[test]
    fn test_registered_signals_are_enforced() {
        let channel = Channel::new();
        calculator(&channel);
        let (id, mut rx) = active_session(&channel);
        channel.dispatch(id, r#"{"type":"subscribe","object":"calc"}"#);

        let sink = channel.notifier();
        sink.publish("calc", "totalReset", Vec::new());
        assert!(drain(&mut rx).is_empty());

        sink.publish("calc", "totalChanged", vec![json!(3)]);
        assert_eq!(
            drain(&mut rx),
            vec![ServerMessage::signal("calc", "totalChanged", vec![json!(3)])]
        );
    }
}

//! Signal publication seam between domain objects and the channel.

use serde_json::Value;

/// Receives signals emitted by registered objects.
///
/// Domain objects hold an `Arc<dyn NotifySink>` and call [`publish`] after
/// every state change. The channel's session hub implements this trait and
/// fans the signal out to subscribed sessions.
///
/// Implementations must not block: objects publish while holding their
/// state lock so that notification order matches mutation order.
///
/// [`publish`]: NotifySink::publish
pub trait NotifySink: Send + Sync {
    /// Publishes `signal` of `object` with `args`.
    fn publish(&self, object: &str, signal: &str, args: Vec<Value>);
}

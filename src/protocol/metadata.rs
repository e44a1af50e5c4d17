//! Object metadata sent in the `init` handshake reply.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshot of one registered object, enough for a client to build a proxy.
///
/// # Format
///
/// ```json
/// {
///   "properties": { "userName": "Valerie Luna", "items": ["Milk"] },
///   "methods": ["addItem", "removeItem"],
///   "signals": ["itemAdded", "itemRemoved", "userNameChanged"]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Current property values keyed by property name.
    pub properties: BTreeMap<String, Value>,
    /// Invocable method names, in declaration order.
    pub methods: Vec<String>,
    /// Emittable signal names, in declaration order.
    pub signals: Vec<String>,
}

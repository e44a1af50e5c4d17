//! The demo backend object.
//!
//! Holds a user name and a shopping list. Every mutation publishes a signal
//! while the state lock is held, so subscribers observe changes in the
//! order they were applied.
//!
//! # Remote Interface
//!
//! | Member | Kind | Notes |
//! |--------|------|-------|
//! | `userName` | property (read/write) | notifies `userNameChanged` |
//! | `items` | property (read-only) | |
//! | `addItem(item)` | method | appends, emits `itemAdded` |
//! | `removeItem(item)` | method | removes all copies, emits `itemRemoved` once |
//! | `itemAdded`, `itemRemoved`, `userNameChanged` | signals | one string argument |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{Error, Result};
use crate::object::{MethodDescriptor, NotifySink, ObjectTable, PropertyDescriptor, string_arg};

// ============================================================================
// Constants
// ============================================================================

/// Name the backend is registered under.
pub const BACKEND_OBJECT_NAME: &str = "backend";

/// Initial user name.
pub const DEFAULT_USER_NAME: &str = "Valerie Luna";

/// Initial shopping list.
pub const DEFAULT_ITEMS: [&str; 4] = ["Milk", "Bread", "Cheese", "Beer"];

/// Signal names emitted by the backend.
pub mod signals {
    /// Emitted after `addItem` with the added item.
    pub const ITEM_ADDED: &str = "itemAdded";
    /// Emitted after `removeItem` removed at least one copy.
    pub const ITEM_REMOVED: &str = "itemRemoved";
    /// Emitted after every `userName` write with the new name.
    pub const USER_NAME_CHANGED: &str = "userNameChanged";
}

// ============================================================================
// Backend
// ============================================================================

#[derive(Debug)]
struct BackendState {
    user_name: String,
    items: Vec<String>,
}

/// The single domain object exposed to clients.
pub struct Backend {
    /// Name used when publishing signals.
    name: String,
    /// Mutable state; all mutations are serialized through this lock.
    state: Mutex<BackendState>,
    /// Signal destination.
    sink: Arc<dyn NotifySink>,
}

impl Backend {
    /// Creates a backend with the default user name and items.
    #[must_use]
    pub fn new(sink: Arc<dyn NotifySink>) -> Arc<Self> {
        Self::with_state(
            sink,
            DEFAULT_USER_NAME,
            DEFAULT_ITEMS.iter().map(|s| (*s).to_string()).collect(),
        )
    }

    /// Creates a backend with explicit initial state.
    #[must_use]
    pub fn with_state(
        sink: Arc<dyn NotifySink>,
        user_name: impl Into<String>,
        items: Vec<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: BACKEND_OBJECT_NAME.to_string(),
            state: Mutex::new(BackendState {
                user_name: user_name.into(),
                items,
            }),
            sink,
        })
    }

    /// Returns the current user name.
    #[must_use]
    pub fn user_name(&self) -> String {
        self.state.lock().user_name.clone()
    }

    /// Returns a copy of the item list.
    #[must_use]
    pub fn items(&self) -> Vec<String> {
        self.state.lock().items.clone()
    }

    /// Sets the user name and emits `userNameChanged`.
    pub fn set_user_name(&self, user_name: impl Into<String>) {
        let user_name = user_name.into();
        let mut state = self.state.lock();
        state.user_name.clone_from(&user_name);

        debug!(user_name = %user_name, "User name changed");
        self.emit(signals::USER_NAME_CHANGED, json!(user_name));
    }

    /// Appends an item and emits `itemAdded`. Duplicates are allowed.
    pub fn add_item(&self, item: impl Into<String>) {
        let item = item.into();
        let mut state = self.state.lock();
        state.items.push(item.clone());

        debug!(item = %item, count = state.items.len(), "Item added");
        self.emit(signals::ITEM_ADDED, json!(item));
    }

    /// Removes every copy of `item`.
    ///
    /// Emits `itemRemoved` once if anything was removed; a missing item is
    /// a silent no-op. Returns the number of copies removed.
    pub fn remove_item(&self, item: &str) -> usize {
        let mut state = self.state.lock();
        let before = state.items.len();
        state.items.retain(|existing| existing != item);
        let removed = before - state.items.len();

        if removed > 0 {
            debug!(item, removed, "Item removed");
            self.emit(signals::ITEM_REMOVED, json!(item));
        }

        removed
    }

    /// Publishes a signal. Callers hold the state lock.
    fn emit(&self, signal: &str, arg: Value) {
        self.sink.publish(&self.name, signal, vec![arg]);
    }
}

// ============================================================================
// Backend - Descriptor Table
// ============================================================================

impl Backend {
    /// Builds the descriptor table exposing this backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the table is inconsistent.
    pub fn object_table(self: &Arc<Self>) -> Result<ObjectTable> {
        let read_name = Arc::clone(self);
        let write_name = Arc::clone(self);
        let read_items = Arc::clone(self);
        let add = Arc::clone(self);
        let remove = Arc::clone(self);

        ObjectTable::builder()
            .property(
                PropertyDescriptor::read_write(
                    "userName",
                    move || json!(read_name.user_name()),
                    move |value| match value {
                        Value::String(name) => {
                            write_name.set_user_name(name);
                            Ok(())
                        }
                        other => Err(Error::invalid_argument(format!(
                            "userName must be a string, got {other}"
                        ))),
                    },
                )
                .notify(signals::USER_NAME_CHANGED),
            )
            .property(PropertyDescriptor::read_only("items", move || {
                json!(read_items.items())
            }))
            .method(MethodDescriptor::new("addItem", move |args| {
                add.add_item(string_arg(args, 0, "addItem")?);
                Ok(Value::Null)
            }))
            .method(MethodDescriptor::new("removeItem", move |args| {
                remove.remove_item(&string_arg(args, 0, "removeItem")?);
                Ok(Value::Null)
            }))
            .signal(signals::ITEM_ADDED)
            .signal(signals::ITEM_REMOVED)
            .signal(signals::USER_NAME_CHANGED)
            .build()
    }
}

// ============================================================================
// Tests
// ============================================================================

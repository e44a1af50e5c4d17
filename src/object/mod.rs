//! Registered object descriptors.
//!
//! An object exposed over the channel is described by an explicit table
//! built once at registration time: properties with typed getter/setter
//! closures, methods with handler closures, and the signals it may emit.
//! There is no runtime reflection.
//!
//! # Example
//!
//! ```ignore
//! use serde_json::json;
//! use webchannel::object::{MethodDescriptor, ObjectTable, PropertyDescriptor};
//!
//! let table = ObjectTable::builder()
//!     .property(PropertyDescriptor::read_only("answer", || json!(42)))
//!     .method(MethodDescriptor::new("ping", |_args| Ok(json!("pong"))).returning())
//!     .build()?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Property, method and object table types.
pub mod descriptor;

/// The [`NotifySink`] publication trait.
pub mod notify;

// ============================================================================
// Re-exports
// ============================================================================

pub use descriptor::{
    Getter, MethodDescriptor, MethodHandler, ObjectTable, ObjectTableBuilder, PropertyDescriptor,
    Setter, string_arg,
};
pub use notify::NotifySink;

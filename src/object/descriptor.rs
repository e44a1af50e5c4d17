//! Hand-written descriptor tables for registered objects.
//!
//! Each registered object is represented by an [`ObjectTable`] mapping
//! member names to typed handler closures. Closures usually capture an
//! `Arc` of the domain object they expose.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashSet;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::protocol::ObjectMetadata;

// ============================================================================
// Handler Types
// ============================================================================

/// Reads the current value of a property.
pub type Getter = Box<dyn Fn() -> Value + Send + Sync>;

/// Applies a new value to a property.
pub type Setter = Box<dyn Fn(Value) -> Result<()> + Send + Sync>;

/// Invokes a method with positional arguments.
///
/// Methods without a return value return [`Value::Null`].
pub type MethodHandler = Box<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

// ============================================================================
// PropertyDescriptor
// ============================================================================

/// A property exposed by a registered object.
pub struct PropertyDescriptor {
    /// Property name.
    name: String,
    /// Value reader.
    getter: Getter,
    /// Value writer; `None` for read-only properties.
    setter: Option<Setter>,
    /// Signal emitted after a write, if any.
    notify: Option<String>,
}

impl PropertyDescriptor {
    /// Creates a read-only property.
    #[must_use]
    pub fn read_only(
        name: impl Into<String>,
        getter: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            getter: Box::new(getter),
            setter: None,
            notify: None,
        }
    }

    /// Creates a read/write property.
    #[must_use]
    pub fn read_write(
        name: impl Into<String>,
        getter: impl Fn() -> Value + Send + Sync + 'static,
        setter: impl Fn(Value) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            getter: Box::new(getter),
            setter: Some(Box::new(setter)),
            notify: None,
        }
    }

    /// Declares the signal the object emits after this property changes.
    #[inline]
    #[must_use]
    pub fn notify(mut self, signal: impl Into<String>) -> Self {
        self.notify = Some(signal.into());
        self
    }

    /// Returns the property name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the change-notification signal, if any.
    #[inline]
    #[must_use]
    pub fn notify_signal(&self) -> Option<&str> {
        self.notify.as_deref()
    }

    /// Returns `true` if the property accepts writes.
    #[inline]
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// Reads the current value.
    #[inline]
    #[must_use]
    pub fn read(&self) -> Value {
        (self.getter)()
    }

    /// Writes a new value.
    ///
    /// Returns `Ok(false)` without touching state when the property is
    /// read-only; the caller owns the object name needed for the error.
    ///
    /// # Errors
    ///
    /// Whatever the setter returns, typically [`Error::InvalidArgument`].
    pub fn write(&self, value: Value) -> Result<bool> {
        match &self.setter {
            Some(setter) => setter(value).map(|()| true),
            None => Ok(false),
        }
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("writable", &self.is_writable())
            .field("notify", &self.notify)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// MethodDescriptor
// ============================================================================

/// A method exposed by a registered object.
pub struct MethodDescriptor {
    /// Method name.
    name: String,
    /// Whether the method produces a value sent back as `methodReturn`.
    returns: bool,
    /// Invocation handler.
    handler: MethodHandler,
}

impl MethodDescriptor {
    /// Creates a method with no return value.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        handler: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            returns: false,
            handler: Box::new(handler),
        }
    }

    /// Marks the method as returning a value.
    #[inline]
    #[must_use]
    pub fn returning(mut self) -> Self {
        self.returns = true;
        self
    }

    /// Returns the method name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the method declares a return value.
    #[inline]
    #[must_use]
    pub fn returns_value(&self) -> bool {
        self.returns
    }

    /// Invokes the handler.
    ///
    /// # Errors
    ///
    /// Whatever the handler returns, typically [`Error::InvalidArgument`].
    #[inline]
    pub fn invoke(&self, args: &[Value]) -> Result<Value> {
        (self.handler)(args)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("returns", &self.returns)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ObjectTable
// ============================================================================

/// Descriptor table of one registered object.
///
/// Immutable after [`ObjectTableBuilder::build`].
#[derive(Debug)]
pub struct ObjectTable {
    properties: Vec<PropertyDescriptor>,
    methods: Vec<MethodDescriptor>,
    signals: Vec<String>,
}

impl ObjectTable {
    /// Creates a new table builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ObjectTableBuilder {
        ObjectTableBuilder::default()
    }

    /// Looks up a property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Looks up a method by name.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Returns the declared signal names.
    #[inline]
    #[must_use]
    pub fn signals(&self) -> &[String] {
        &self.signals
    }

    /// Snapshots current property values and member names.
    #[must_use]
    pub fn metadata(&self) -> ObjectMetadata {
        let properties: BTreeMap<String, Value> = self
            .properties
            .iter()
            .map(|p| (p.name.clone(), p.read()))
            .collect();

        ObjectMetadata {
            properties,
            methods: self.methods.iter().map(|m| m.name.clone()).collect(),
            signals: self.signals.clone(),
        }
    }
}

// ============================================================================
// ObjectTableBuilder
// ============================================================================

/// Builder for an [`ObjectTable`].
#[derive(Default)]
pub struct ObjectTableBuilder {
    properties: Vec<PropertyDescriptor>,
    methods: Vec<MethodDescriptor>,
    signals: Vec<String>,
}

impl ObjectTableBuilder {
    /// Adds a property.
    #[inline]
    #[must_use]
    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    /// Adds a method.
    #[inline]
    #[must_use]
    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    /// Declares a signal.
    #[inline]
    #[must_use]
    pub fn signal(mut self, name: impl Into<String>) -> Self {
        self.signals.push(name.into());
        self
    }

    /// Builds the table with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if a member name is declared twice
    /// - [`Error::Config`] if a property's notify signal is not declared
    pub fn build(self) -> Result<ObjectTable> {
        let mut seen = FxHashSet::default();
        let names = self
            .properties
            .iter()
            .map(|p| p.name.as_str())
            .chain(self.methods.iter().map(|m| m.name.as_str()))
            .chain(self.signals.iter().map(String::as_str));

        for name in names {
            if !seen.insert(name) {
                return Err(Error::config(format!("Member declared twice: {name}")));
            }
        }

        for property in &self.properties {
            if let Some(signal) = property.notify_signal()
                && !self.signals.iter().any(|s| s == signal)
            {
                return Err(Error::config(format!(
                    "Property {} notifies undeclared signal {signal}",
                    property.name
                )));
            }
        }

        Ok(ObjectTable {
            properties: self.properties,
            methods: self.methods,
            signals: self.signals,
        })
    }
}

// ============================================================================
// Argument Helpers
// ============================================================================

/// Extracts a string argument at `index`.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the argument is missing or not a string.
pub fn string_arg(args: &[Value], index: usize, context: &str) -> Result<String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(Error::invalid_argument(format!(
            "{context}: argument {index} must be a string, got {other}"
        ))),
        None => Err(Error::invalid_argument(format!(
            "{context}: missing argument {index}"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================

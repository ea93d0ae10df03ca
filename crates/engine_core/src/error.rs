//! Component schema errors.

use thiserror::Error;

/// A read or write that does not fit a component kind's fixed schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComponentError {
    /// The kind has no property with that name.
    #[error("{kind} has no property '{property}'")]
    UnknownProperty { kind: String, property: String },

    /// The value type does not match the property's declared type.
    #[error("{kind}.{property} expects {expected}, got {found}")]
    TypeMismatch {
        kind: String,
        property: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A system needed a component the object does not carry.
    #[error("missing {kind} component")]
    Missing { kind: String },
}

//! Duck-typed parent resources
//!
//! The controller operates over parent kinds known only by their
//! kind/version/group, read as `DynamicObject`s. Each version of the duck
//! shape lives in its own module and exposes an explicit decode step, so a
//! shape mismatch surfaces as a `DecodeError` rather than a panic.

pub mod v1alpha1;

use thiserror::Error;

/// Errors that can occur while decoding a stored object into a duck type.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The object does not match the expected shape
    #[error("{kind} does not match the WithPod shape: {source}")]
    Shape {
        /// Kind of the object being decoded
        kind: String,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// A field the controller depends on is absent
    #[error("{kind} is missing required field {field}")]
    MissingField {
        /// Kind of the object being decoded
        kind: String,
        /// JSON path of the missing field
        field: &'static str,
    },
}

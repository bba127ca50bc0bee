//! Object references shared by the parent and child shapes
//!
//! Pull secrets are copied verbatim from a parent's pod template into each
//! `Image` it owns, so both sides use the same reference type.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to an object in the same namespace, by name.
///
/// Mirrors the Kubernetes `LocalObjectReference` used for `imagePullSecrets`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocalObjectReference {
    /// Name of the referenced object
    #[serde(default)]
    pub name: String,
}

impl LocalObjectReference {
    /// Create a new reference to the named object
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_name_defaults_to_empty() {
        let reference: LocalObjectReference = serde_json::from_str("{}").unwrap();
        assert_eq!(reference, LocalObjectReference::default());
    }
}

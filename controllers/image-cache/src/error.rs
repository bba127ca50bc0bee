//! Controller-specific error types.
//!
//! This module defines error types specific to the Image Cache Controller
//! that are not covered by upstream library errors.

use crds::DecodeError;
use kube::Error as KubeError;
use resource_store::StoreError;
use thiserror::Error;

/// Errors that can occur in the Image Cache Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error (client setup, discovery)
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Resource store read/write error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Stored object does not have the expected shape
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Kubernetes client configuration could not be loaded
    #[error("Client configuration error: {0}")]
    ClientConfig(String),

    /// Reconcile key is not of the form `name` or `namespace/name`
    #[error("Invalid resource key: {0}")]
    InvalidKey(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Whether retrying the failed operation may succeed.
    ///
    /// Only store and API calls are transient; a malformed key or an object
    /// of the wrong shape stays that way.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ControllerError::Kube(_) | ControllerError::Store(_))
    }
}

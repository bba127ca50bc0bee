//! Resource store errors

use thiserror::Error;

/// Errors that can occur when talking to the resource store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Selector would match more than the caller intends (e.g. empty selector)
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Invalid request (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Store temporarily unavailable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

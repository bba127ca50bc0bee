//! ResourceStore trait for mocking
//!
//! The reconciler only talks to the API server through this trait. The
//! concrete `KubeStore` implements it on top of `kube::Api`, and tests use
//! the in-memory `MockStore`.

use crate::error::StoreError;
use crate::selector::LabelSelector;
use crds::Image;
use kube::api::DynamicObject;

/// Trait for resource store operations
///
/// A store is bound to one parent kind; `Image` operations are shared across
/// kinds. All async methods must be `Send` to work with Tokio's work-stealing
/// runtime.
#[async_trait::async_trait]
pub trait ResourceStore: Send + Sync {
    /// Get a parent by namespace and name. Returns `None` when it does not exist.
    ///
    /// An empty namespace addresses a cluster-scoped parent.
    async fn get_parent(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>, StoreError>;

    /// List Images in a namespace matching a label selector
    async fn list_images(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Image>, StoreError>;

    /// Create an Image in its own namespace, returning the stored object
    async fn create_image(&self, image: &Image) -> Result<Image, StoreError>;

    /// Delete every Image in a namespace matching a label selector, with
    /// foreground propagation
    async fn delete_images(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<(), StoreError>;
}

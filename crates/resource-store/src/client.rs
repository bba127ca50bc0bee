//! Kubernetes-backed resource store
//!
//! Parents are read as `DynamicObject`s through the `ApiResource` of the kind
//! being watched; Images are accessed through their typed API.

use crate::error::StoreError;
use crate::selector::LabelSelector;
use crate::store_trait::ResourceStore;
use crds::Image;
use kube::api::{Api, ApiResource, DeleteParams, DynamicObject, ListParams, PostParams};
use kube::Client;
use tracing::debug;

/// Resource store backed by the Kubernetes API server.
///
/// Cheap to clone; every clone shares the underlying client connection.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    parent: ApiResource,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

impl KubeStore {
    /// Create a store reading parents of the given resource type
    pub fn new(client: Client, parent: ApiResource) -> Self {
        Self { client, parent }
    }

    /// The parent resource type this store reads
    pub fn parent_resource(&self) -> &ApiResource {
        &self.parent
    }

    fn parents(&self, namespace: &str) -> Api<DynamicObject> {
        if namespace.is_empty() {
            Api::all_with(self.client.clone(), &self.parent)
        } else {
            Api::namespaced_with(self.client.clone(), namespace, &self.parent)
        }
    }

    fn images(&self, namespace: &str) -> Api<Image> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Refuse selectors that would match every Image in a namespace
pub(crate) fn ensure_scoped(selector: &LabelSelector) -> Result<(), StoreError> {
    if selector.is_empty() {
        return Err(StoreError::InvalidSelector(
            "refusing to operate on Images with an empty selector".to_string(),
        ));
    }
    Ok(())
}

#[async_trait::async_trait]
impl ResourceStore for KubeStore {
    async fn get_parent(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>, StoreError> {
        debug!(kind = %self.parent.kind, namespace, name, "Getting parent");
        Ok(self.parents(namespace).get_opt(name).await?)
    }

    async fn list_images(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Image>, StoreError> {
        ensure_scoped(selector)?;
        let lp = ListParams::default().labels(&selector.to_string());
        let list = self.images(namespace).list(&lp).await?;
        debug!(namespace, %selector, count = list.items.len(), "Listed Images");
        Ok(list.items)
    }

    async fn create_image(&self, image: &Image) -> Result<Image, StoreError> {
        let namespace = image.metadata.namespace.as_deref().ok_or_else(|| {
            StoreError::InvalidRequest(format!("Image for {} has no namespace", image.spec.image))
        })?;
        let created = self
            .images(namespace)
            .create(&PostParams::default(), image)
            .await?;
        debug!(
            namespace,
            name = created.metadata.name.as_deref().unwrap_or("<generated>"),
            image = %created.spec.image,
            "Created Image"
        );
        Ok(created)
    }

    async fn delete_images(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<(), StoreError> {
        ensure_scoped(selector)?;
        let lp = ListParams::default().labels(&selector.to_string());
        self.images(namespace)
            .delete_collection(&DeleteParams::foreground(), &lp)
            .await?;
        debug!(namespace, %selector, "Deleted Image collection");
        Ok(())
    }
}

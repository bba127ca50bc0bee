//! Reconciliation logic for pod-bearing resources.
//!
//! Each call to `Reconciler::reconcile` is computed from scratch against the
//! store: read the parent, decide whether to cache, diff the Images of the
//! current generation against the wanted set, create what is missing and
//! garbage-collect every other generation. Running it again against unchanged
//! state performs no writes besides the (empty) garbage collection.

use crate::error::ControllerError;
use crate::labels::{current_generation_selector, older_generation_selector};
use crate::policy::Policy;
use crate::resources::make_images;
use crds::WithPod;
use kube::api::ApiResource;
use resource_store::ResourceStore;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of a reconcile that did not need a retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The key was not `name` or `namespace/name`
    InvalidKey,
    /// The parent no longer exists; its Images go with it via owner references
    NotFound,
    /// The stored parent does not have the WithPod shape
    Undecodable,
    /// The parent is cluster-scoped and cannot own namespaced Images
    ClusterScoped,
    /// Caching is off; Images of the current generation were deleted
    Disabled,
    /// Caching is on and every wanted Image exists
    Synced {
        /// Images created by this reconcile, in creation order
        created: Vec<String>,
        /// Images of the current generation that were not wanted
        unexpected: Vec<String>,
    },
}

/// Split a `namespace/name` or `name` key.
pub fn split_key(key: &str) -> Result<(&str, &str), ControllerError> {
    let invalid = || ControllerError::InvalidKey(key.to_string());
    let mut parts = key.split('/');
    let (namespace, name) = match (parts.next(), parts.next(), parts.next()) {
        (Some(name), None, None) => ("", name),
        (Some(namespace), Some(name), None) => (namespace, name),
        _ => return Err(invalid()),
    };
    if name.is_empty() {
        return Err(invalid());
    }
    Ok((namespace, name))
}

/// Build the key of an object from its namespace and name.
pub fn key_for(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(namespace) if !namespace.is_empty() => format!("{namespace}/{name}"),
        _ => name.to_string(),
    }
}

/// Reconciles the Images of one parent kind.
pub struct Reconciler {
    store: Arc<dyn ResourceStore>,
    parent: ApiResource,
    policy: Policy,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("parent", &self.parent)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a new reconciler for parents of the given resource type.
    pub fn new(store: Arc<dyn ResourceStore>, parent: ApiResource, policy: Policy) -> Self {
        Self {
            store,
            parent,
            policy,
        }
    }

    /// The parent resource type this reconciler handles
    pub fn parent_resource(&self) -> &ApiResource {
        &self.parent
    }

    /// Reconciles the parent identified by `key`.
    ///
    /// Errors are transient store failures the caller should retry. Keys that
    /// cannot succeed on retry (malformed, vanished, undecodable) are logged
    /// and reported as an `Outcome` instead.
    pub async fn reconcile(&self, key: &str) -> Result<Outcome, ControllerError> {
        match self.try_reconcile(key).await {
            Err(e) if !e.is_retryable() => {
                error!(
                    kind = %self.parent.kind,
                    key,
                    error = %e,
                    "Dropping {} {}: {}",
                    self.parent.kind,
                    key,
                    e
                );
                Ok(match e {
                    ControllerError::InvalidKey(_) => Outcome::InvalidKey,
                    _ => Outcome::Undecodable,
                })
            }
            result => result,
        }
    }

    async fn try_reconcile(&self, key: &str) -> Result<Outcome, ControllerError> {
        let (namespace, name) = split_key(key)?;

        let Some(obj) = self.store.get_parent(namespace, name).await? else {
            info!(
                kind = %self.parent.kind,
                key,
                "{} {} in work queue no longer exists",
                self.parent.kind,
                key
            );
            return Ok(Outcome::NotFound);
        };
        let parent = WithPod::from_dynamic(&obj, &self.parent)?;
        if parent.namespace().is_empty() {
            warn!(
                kind = %self.parent.kind,
                key,
                "Cluster-scoped {} cannot own namespaced Images",
                self.parent.kind
            );
            return Ok(Outcome::ClusterScoped);
        }

        let outcome = if self.policy.should_manage(&parent) {
            self.reconcile_missing_images(&parent).await?
        } else {
            // Tear down the Images of the current generation
            self.store
                .delete_images(parent.namespace(), &current_generation_selector(&parent))
                .await?;
            Outcome::Disabled
        };

        // Images of any other generation are always stale
        self.store
            .delete_images(parent.namespace(), &older_generation_selector(&parent))
            .await?;

        Ok(outcome)
    }

    /// Ensure every Image the parent's current generation wants exists.
    async fn reconcile_missing_images(&self, parent: &WithPod) -> Result<Outcome, ControllerError> {
        let namespace = parent.namespace();

        let got = self
            .store
            .list_images(namespace, &current_generation_selector(parent))
            .await?;
        let mut want = make_images(parent);

        let mut unexpected = Vec::new();
        for image in &got {
            if want.remove(image.image_key()).is_none() {
                // Left in place so a duplicate surfaces instead of being masked
                warn!(
                    namespace,
                    parent = parent.name(),
                    image = image.image_key(),
                    "Got unexpected Image: {}",
                    image.image_key()
                );
                unexpected.push(image.image_key().to_string());
            }
        }

        // BTreeMap iteration creates in lexicographic order of image reference
        let mut created = Vec::with_capacity(want.len());
        for (key, image) in want {
            let stored = self.store.create_image(&image).await?;
            info!(
                namespace,
                parent = parent.name(),
                name = stored.metadata.name.as_deref().unwrap_or_default(),
                image = %key,
                "Created Image for {}",
                key
            );
            created.push(key);
        }

        Ok(Outcome::Synced {
            created,
            unexpected,
        })
    }
}

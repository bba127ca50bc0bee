//! Test utilities for unit testing the reconciler
//!
//! Helpers to build parents in their typed and dynamic forms and to wire a
//! `Reconciler` to an in-memory `MockStore`.

use crate::policy::Policy;
use crate::reconciler::Reconciler;
use crds::{Container, WithPod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use resource_store::MockStore;
use std::sync::Arc;

/// The parent resource type used throughout the tests
pub fn deployments() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk("apps", "v1", "Deployment"))
}

/// A Deployment with one container per image, named after its position.
pub fn with_pod(
    namespace: &str,
    name: &str,
    uid: &str,
    generation: i64,
    images: &[&str],
) -> WithPod {
    let mut parent = WithPod {
        api_version: "apps/v1".to_string(),
        kind: "Deployment".to_string(),
        ..Default::default()
    };
    parent.metadata.namespace = Some(namespace.to_string());
    parent.metadata.name = Some(name.to_string());
    parent.metadata.uid = Some(uid.to_string());
    parent.metadata.generation = Some(generation);
    parent.spec.template.spec.containers = images
        .iter()
        .enumerate()
        .map(|(idx, image)| Container::with_image(format!("c{idx}"), *image))
        .collect();
    parent
}

/// Set an annotation on the parent
pub fn annotate(mut parent: WithPod, key: &str, value: &str) -> WithPod {
    parent
        .metadata
        .annotations
        .get_or_insert_with(Default::default)
        .insert(key.to_string(), value.to_string());
    parent
}

/// Mark the parent as controlled by another resource
pub fn controlled_by(mut parent: WithPod, kind: &str, name: &str) -> WithPod {
    parent
        .metadata
        .owner_references
        .get_or_insert_with(Vec::new)
        .push(OwnerReference {
            api_version: "apps/v1".to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            uid: format!("{name}-uid"),
            controller: Some(true),
            block_owner_deletion: Some(true),
        });
    parent
}

/// The parent as the API server would return it
pub fn to_dynamic(parent: &WithPod) -> DynamicObject {
    serde_json::from_value(serde_json::to_value(parent).unwrap()).unwrap()
}

/// A reconciler for Deployments backed by the given mock store
pub fn reconciler(store: &MockStore) -> Reconciler {
    Reconciler::new(Arc::new(store.clone()), deployments(), Policy::default())
}

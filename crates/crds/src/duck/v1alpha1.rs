//! WithPod duck type, version v1alpha1
//!
//! Matches any resource shaped like a Deployment, ReplicaSet, StatefulSet,
//! DaemonSet, Job, ...: an object with `spec.template.spec` holding a pod spec.
//! Only the fields the controller reads are decoded; everything else in the
//! stored object is ignored.

use super::DecodeError;
use crate::references::LocalObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::api::{ApiResource, DynamicObject};
use serde::{Deserialize, Serialize};

/// A resource embedding a pod template.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WithPod {
    /// apiVersion of the concrete resource (e.g. "apps/v1")
    #[serde(default)]
    pub api_version: String,

    /// Kind of the concrete resource (e.g. "Deployment")
    #[serde(default)]
    pub kind: String,

    /// Standard object metadata
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// The part of the spec holding the pod template
    #[serde(default)]
    pub spec: WithPodSpec,
}

/// Spec holding the pod template.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WithPodSpec {
    /// Pod template
    #[serde(default)]
    pub template: PodSpecable,
}

/// A pod template: metadata plus pod spec.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodSpecable {
    /// Template metadata
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// Pod spec
    #[serde(default)]
    pub spec: PodSpec,
}

/// The subset of a pod spec relevant to image caching.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Containers, in template order
    #[serde(default)]
    pub containers: Vec<Container>,

    /// Service account the pod runs as
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,

    /// Secrets used to pull the pod's images
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,
}

/// The subset of a container relevant to image caching.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Container name
    #[serde(default)]
    pub name: String,

    /// Image reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Container {
    /// Create a container running the given image
    pub fn with_image(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: Some(image.into()),
        }
    }
}

impl WithPod {
    /// Decode a dynamically typed object of the given resource into a `WithPod`.
    ///
    /// `apiVersion` and `kind` fall back to the watched resource when the stored
    /// object omits them. Name and UID must be present since child resources
    /// are labeled and owned by them.
    pub fn from_dynamic(obj: &DynamicObject, resource: &ApiResource) -> Result<Self, DecodeError> {
        let shape_error = |source| DecodeError::Shape {
            kind: resource.kind.clone(),
            source,
        };
        let value = serde_json::to_value(obj).map_err(shape_error)?;
        let mut parent: WithPod = serde_json::from_value(value).map_err(shape_error)?;

        if parent.api_version.is_empty() {
            parent.api_version = resource.api_version.clone();
        }
        if parent.kind.is_empty() {
            parent.kind = resource.kind.clone();
        }

        let missing = |field| DecodeError::MissingField {
            kind: resource.kind.clone(),
            field,
        };
        if parent.metadata.name.as_deref().is_none_or(str::is_empty) {
            return Err(missing("metadata.name"));
        }
        if parent.metadata.uid.as_deref().is_none_or(str::is_empty) {
            return Err(missing("metadata.uid"));
        }

        Ok(parent)
    }

    /// Name of the resource
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Namespace of the resource (empty for cluster-scoped resources)
    pub fn namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or_default()
    }

    /// Unique ID of the resource
    pub fn uid(&self) -> &str {
        self.metadata.uid.as_deref().unwrap_or_default()
    }

    /// Generation of the resource's spec
    pub fn generation(&self) -> i64 {
        self.metadata.generation.unwrap_or_default()
    }

    /// Value of the given annotation, if set
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(key))
            .map(String::as_str)
    }

    /// The owner reference marked as this resource's controller, if any
    pub fn controller_of(&self) -> Option<&OwnerReference> {
        self.metadata
            .owner_references
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|owner| owner.controller == Some(true))
    }

    /// An owner reference marking this resource as the controller of a dependent
    pub fn controller_ref(&self) -> OwnerReference {
        OwnerReference {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            name: self.name().to_string(),
            uid: self.uid().to_string(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    /// The pod spec embedded in the template
    pub fn pod_spec(&self) -> &PodSpec {
        &self.spec.template.spec
    }
}

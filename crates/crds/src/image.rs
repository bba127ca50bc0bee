//! Image CRD
//!
//! Cache hint for a single container image. One `Image` exists per distinct
//! image referenced by a parent's pod template, for the parent's current
//! generation. Instances are created and deleted by the controller, never
//! updated in place.

use crate::references::LocalObjectReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "caching.internal.knative.dev",
    version = "v1alpha1",
    kind = "Image",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    /// Image reference to cache (e.g. "busybox" or "gcr.io/foo/bar@sha256:...")
    pub image: String,

    /// Service account used to pull the image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,

    /// Pull secrets used to pull the image
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,
}

impl Image {
    /// The deduplication key of this resource: its image reference.
    pub fn image_key(&self) -> &str {
        &self.spec.image
    }
}

//! Image Cache CRD Definitions
//!
//! Kubernetes resource shapes used by the image cache controller:
//! - `Image`: the cache-hint resource created once per distinct container image
//! - `duck::v1alpha1::WithPod`: the duck-typed view of any parent that embeds a pod template

pub mod duck;
pub mod image;
pub mod references;

pub use duck::v1alpha1::{Container, PodSpec, PodSpecable, WithPod, WithPodSpec};
pub use duck::DecodeError;
pub use image::*;
pub use references::*;

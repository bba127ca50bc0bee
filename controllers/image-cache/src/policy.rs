//! Caching policy.
//!
//! Decides per parent whether its images should be cached. An explicit
//! annotation always wins; without one, resources controlled by another
//! resource are skipped (a ReplicaSet owned by a Deployment is cached through
//! the Deployment).

use crds::WithPod;
use tracing::debug;

/// Default annotation forcing caching on or off for a single resource.
pub const DEFAULT_ANNOTATION_KEY: &str = "cachier.mattmoor.io/decorate";

/// Outcome of the policy for one parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The annotation carries a recognized value
    Forced(bool),
    /// No recognized annotation; decided by ownership
    Default(bool),
}

impl Decision {
    /// Whether the parent's images should be cached
    pub fn manage(self) -> bool {
        match self {
            Decision::Forced(manage) | Decision::Default(manage) => manage,
        }
    }
}

/// Interpret an annotation value. `None` for unrecognized values.
pub fn parse_override(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "enable" | "enabled" => Some(true),
        "false" | "off" | "disable" | "disabled" => Some(false),
        _ => None,
    }
}

/// Caching policy keyed on a single annotation.
#[derive(Debug, Clone)]
pub struct Policy {
    annotation_key: String,
}

impl Default for Policy {
    fn default() -> Self {
        Self::new(DEFAULT_ANNOTATION_KEY)
    }
}

impl Policy {
    /// Create a policy keyed on the given annotation
    pub fn new(annotation_key: impl Into<String>) -> Self {
        Self {
            annotation_key: annotation_key.into(),
        }
    }

    /// The annotation this policy reads
    pub fn annotation_key(&self) -> &str {
        &self.annotation_key
    }

    /// Decide whether to cache the parent's images.
    pub fn decide(&self, parent: &WithPod) -> Decision {
        if let Some(forced) = parent.annotation(&self.annotation_key).and_then(parse_override) {
            return Decision::Forced(forced);
        }
        Decision::Default(parent.controller_of().is_none())
    }

    /// Whether the parent's images should be cached, logging the decision.
    pub fn should_manage(&self, parent: &WithPod) -> bool {
        let decision = self.decide(parent);
        debug!(
            namespace = parent.namespace(),
            name = parent.name(),
            annotation = self.annotation_key(),
            ?decision,
            "Evaluated caching policy"
        );
        decision.manage()
    }
}

//! Generation labels.
//!
//! Every `Image` is labeled with the UID and generation of the parent version
//! that produced it. The same pair scopes the selectors used to find a
//! parent's Images, so one parent's selectors never reach another's.

use crds::WithPod;
use resource_store::LabelSelector;
use std::collections::BTreeMap;

/// Label holding the owning parent's UID
pub const CONTROLLER_LABEL: &str = "controller";

/// Label holding the owning parent's generation, in decimal
pub const GENERATION_LABEL: &str = "generation";

/// Labels tagging a child of the parent's current generation.
pub fn labels_for(parent: &WithPod) -> BTreeMap<String, String> {
    BTreeMap::from([
        (CONTROLLER_LABEL.to_string(), parent.uid().to_string()),
        (GENERATION_LABEL.to_string(), parent.generation().to_string()),
    ])
}

/// Selects children of the parent's current generation.
pub fn current_generation_selector(parent: &WithPod) -> LabelSelector {
    LabelSelector::from_labels(&labels_for(parent))
}

/// Selects children of any other generation of the parent.
///
/// Labels are opaque strings, so this is "generation present and not equal to
/// the current one" rather than a numeric comparison. A parent never reuses a
/// generation value, which makes the two equivalent.
pub fn older_generation_selector(parent: &WithPod) -> LabelSelector {
    LabelSelector::new()
        .equals(CONTROLLER_LABEL, parent.uid())
        .exists(GENERATION_LABEL)
        .not_equals(GENERATION_LABEL, parent.generation().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::with_pod;

    #[test]
    fn test_labels_for() {
        let parent = with_pod("bar", "foo", "deadbeef", 37837, &[]);
        let labels = labels_for(&parent);
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["controller"], "deadbeef");
        assert_eq!(labels["generation"], "37837");
    }

    #[test]
    fn test_current_generation_selector() {
        let parent = with_pod("bar", "foo", "deadbeef", 37837, &[]);
        let selector = current_generation_selector(&parent);
        assert_eq!(selector.to_string(), "controller=deadbeef,generation=37837");
        assert!(selector.matches(&labels_for(&parent)));
    }

    #[test]
    fn test_older_generation_selector() {
        let parent = with_pod("bar", "foo", "deadbeef", 3, &[]);
        let selector = older_generation_selector(&parent);
        assert_eq!(
            selector.to_string(),
            "controller=deadbeef,generation,generation!=3"
        );

        let older = with_pod("bar", "foo", "deadbeef", 2, &[]);
        let newer = with_pod("bar", "foo", "deadbeef", 4, &[]);
        let other_parent = with_pod("bar", "foo", "cafebabe", 2, &[]);
        assert!(selector.matches(&labels_for(&older)));
        assert!(selector.matches(&labels_for(&newer)));
        assert!(!selector.matches(&labels_for(&parent)));
        assert!(!selector.matches(&labels_for(&other_parent)));
    }

    #[test]
    fn test_older_generation_selector_requires_generation_label() {
        let parent = with_pod("bar", "foo", "deadbeef", 3, &[]);
        let unlabeled = BTreeMap::from([(CONTROLLER_LABEL.to_string(), "deadbeef".to_string())]);
        assert!(!older_generation_selector(&parent).matches(&unlabeled));
    }
}

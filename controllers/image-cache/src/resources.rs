//! Desired Image resources for a parent.

use crate::labels::labels_for;
use crds::{Image, ImageSpec, WithPod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Build the deduplicated set of Images the parent's current generation wants,
/// keyed by image reference.
///
/// Containers are visited in template order and the first container using an
/// image names it (`{parent}-{index:02}-`). The index only keeps generated
/// names apart; identity is the image reference. Containers without an image
/// are skipped.
pub fn make_images(parent: &WithPod) -> BTreeMap<String, Image> {
    let pod = parent.pod_spec();
    let mut images = BTreeMap::new();

    for (idx, container) in pod.containers.iter().enumerate() {
        let Some(image) = container.image.as_deref().filter(|i| !i.is_empty()) else {
            continue;
        };
        if images.contains_key(image) {
            continue;
        }
        images.insert(
            image.to_string(),
            Image {
                metadata: ObjectMeta {
                    generate_name: Some(format!("{}-{:02}-", parent.name(), idx)),
                    namespace: Some(parent.namespace().to_string()),
                    labels: Some(labels_for(parent)),
                    owner_references: Some(vec![parent.controller_ref()]),
                    ..Default::default()
                },
                spec: ImageSpec {
                    image: image.to_string(),
                    service_account_name: pod.service_account_name.clone(),
                    image_pull_secrets: pod.image_pull_secrets.clone(),
                },
            },
        );
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::with_pod;
    use crds::{Container, LocalObjectReference};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

    fn expected(generate_name: &str, image: &str) -> Image {
        Image {
            metadata: ObjectMeta {
                generate_name: Some(generate_name.to_string()),
                namespace: Some("bar".to_string()),
                labels: Some(BTreeMap::from([
                    ("controller".to_string(), "deadbeef".to_string()),
                    ("generation".to_string(), "37837".to_string()),
                ])),
                owner_references: Some(vec![OwnerReference {
                    api_version: "apps/v1".to_string(),
                    kind: "Deployment".to_string(),
                    name: "foo".to_string(),
                    uid: "deadbeef".to_string(),
                    controller: Some(true),
                    block_owner_deletion: Some(true),
                }]),
                ..Default::default()
            },
            spec: ImageSpec {
                image: image.to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_no_containers() {
        let parent = with_pod("bar", "foo", "asdfdffsd", 98345, &[]);
        assert!(make_images(&parent).is_empty());
    }

    #[test]
    fn test_single_container() {
        let parent = with_pod("bar", "foo", "deadbeef", 37837, &["busybox"]);
        let images = make_images(&parent);
        assert_eq!(
            images,
            BTreeMap::from([("busybox".to_string(), expected("foo-00-", "busybox"))])
        );
    }

    #[test]
    fn test_multiple_containers() {
        let parent = with_pod(
            "bar",
            "foo",
            "deadbeef",
            37837,
            &["busybox", "hello-world", "k8s.gcr.io/pause:latest"],
        );
        let images = make_images(&parent);
        assert_eq!(
            images,
            BTreeMap::from([
                ("busybox".to_string(), expected("foo-00-", "busybox")),
                ("hello-world".to_string(), expected("foo-01-", "hello-world")),
                (
                    "k8s.gcr.io/pause:latest".to_string(),
                    expected("foo-02-", "k8s.gcr.io/pause:latest")
                ),
            ])
        );
    }

    #[test]
    fn test_duplicate_images_collapse_to_first_occurrence() {
        let parent = with_pod(
            "bar",
            "foo",
            "deadbeef",
            37837,
            &["busybox", "hello-world", "busybox"],
        );
        let images = make_images(&parent);
        assert_eq!(images.len(), 2);
        assert_eq!(images["busybox"], expected("foo-00-", "busybox"));
        assert_eq!(images["hello-world"], expected("foo-01-", "hello-world"));
    }

    #[test]
    fn test_single_unique_container() {
        let parent = with_pod(
            "bar",
            "foo",
            "deadbeef",
            37837,
            &["busybox", "busybox", "busybox"],
        );
        let images = make_images(&parent);
        assert_eq!(
            images,
            BTreeMap::from([("busybox".to_string(), expected("foo-00-", "busybox"))])
        );
    }

    #[test]
    fn test_interleaved_duplicates() {
        let parent = with_pod(
            "bar",
            "foo",
            "deadbeef",
            37837,
            &["a", "b", "a", "c", "b", "a"],
        );
        let images = make_images(&parent);
        let keys: Vec<&String> = images.keys().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_with_service_account() {
        let mut parent = with_pod("bar", "foo", "deadbeef", 37837, &["busybox"]);
        parent.spec.template.spec.service_account_name = Some("T-1000".to_string());

        let mut want = expected("foo-00-", "busybox");
        want.spec.service_account_name = Some("T-1000".to_string());
        assert_eq!(make_images(&parent)["busybox"], want);
    }

    #[test]
    fn test_with_image_pull_secrets() {
        let secrets = vec![
            LocalObjectReference::new("secret1"),
            LocalObjectReference::new("secret2"),
            LocalObjectReference::new("secret3"),
        ];
        let mut parent = with_pod("bar", "foo", "deadbeef", 37837, &["busybox"]);
        parent.spec.template.spec.image_pull_secrets = secrets.clone();

        let mut want = expected("foo-00-", "busybox");
        want.spec.image_pull_secrets = secrets;
        assert_eq!(make_images(&parent)["busybox"], want);
    }

    #[test]
    fn test_containers_without_image_are_skipped() {
        let mut parent = with_pod("bar", "foo", "deadbeef", 37837, &[]);
        parent.spec.template.spec.containers = vec![
            Container {
                name: "no-image".to_string(),
                image: None,
            },
            Container::with_image("empty", ""),
            Container::with_image("real", "busybox"),
        ];

        let images = make_images(&parent);
        assert_eq!(images.len(), 1);
        assert_eq!(images["busybox"], expected("foo-02-", "busybox"));
    }

    #[test]
    fn test_builder_is_deterministic() {
        let parent = with_pod("bar", "foo", "deadbeef", 37837, &["z", "a", "m"]);
        assert_eq!(make_images(&parent), make_images(&parent));
    }
}

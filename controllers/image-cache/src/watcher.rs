//! Kubernetes resource watchers.
//!
//! Routes events into reconciles using `kube_runtime::Controller`:
//! - events on a parent enqueue the parent itself
//! - events on an `Image` enqueue the parent controlling it, so a deleted or
//!   edited Image brings its parent back to the wanted state
//!
//! The controller de-duplicates keys, runs at most one reconcile per key and
//! requeues failed keys after the delay chosen by `error_policy`.

use crate::backoff::RetryTracker;
use crate::error::ControllerError;
use crate::reconciler::{Reconciler, key_for};
use crds::Image;
use futures::StreamExt;
use futures::future::{BoxFuture, Shared};
use kube::Api;
use kube::api::{ApiResource, DynamicObject};
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{Controller, watcher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// State shared by every reconcile of one watched kind.
#[derive(Debug)]
pub struct Context {
    /// Engine for the watched kind
    pub reconciler: Reconciler,
    /// Per-key retry delays
    pub retries: RetryTracker,
    /// Requeue delay after a successful reconcile
    pub resync: Duration,
}

/// Group part of an `apiVersion` (empty for the core group).
fn group_of(api_version: &str) -> &str {
    api_version.rsplit_once('/').map_or("", |(group, _)| group)
}

/// Resolve the parent controlling `image`, if it is of the watched kind.
///
/// Only the controlling owner reference counts. The version is ignored so
/// that a parent served under several versions is still matched.
pub fn controller_of(image: &Image, parent: &ApiResource) -> Option<ObjectRef<DynamicObject>> {
    let owner = image
        .metadata
        .owner_references
        .as_deref()?
        .iter()
        .find(|owner| owner.controller == Some(true))?;

    if owner.kind != parent.kind || group_of(&owner.api_version) != parent.group {
        return None;
    }

    let reference = ObjectRef::new_with(&owner.name, parent.clone());
    Some(match image.metadata.namespace.as_deref() {
        Some(namespace) => reference.within(namespace),
        None => reference,
    })
}

async fn reconcile(obj: Arc<DynamicObject>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let name = obj.metadata.name.as_deref().unwrap_or_default();
    let key = key_for(obj.metadata.namespace.as_deref(), name);
    let kind = &ctx.reconciler.parent_resource().kind;

    debug!(kind = %kind, key = %key, "Reconciling {} {}", kind, key);
    let outcome = ctx.reconciler.reconcile(&key).await?;
    debug!(kind = %kind, key = %key, ?outcome, "Reconciled {} {}", kind, key);

    ctx.retries.reset(&key);
    Ok(Action::requeue(ctx.resync))
}

fn error_policy(obj: Arc<DynamicObject>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    let name = obj.metadata.name.as_deref().unwrap_or_default();
    let key = key_for(obj.metadata.namespace.as_deref(), name);
    let delay = ctx.retries.next_delay(&key);

    warn!(
        kind = %ctx.reconciler.parent_resource().kind,
        key = %key,
        error = %error,
        retry_in_secs = delay.as_secs(),
        backing_off = ctx.retries.tracked(),
        "Reconcile failed, retrying in {:?}",
        delay
    );
    Action::requeue(delay)
}

/// Watch parents of one kind, plus the Images they control, until shutdown.
pub async fn watch_resource(
    parents: Api<DynamicObject>,
    images: Api<Image>,
    context: Arc<Context>,
    workers: u16,
    shutdown: Shared<BoxFuture<'static, ()>>,
) -> Result<(), ControllerError> {
    let resource = context.reconciler.parent_resource().clone();
    let kind = resource.kind.clone();
    info!("Starting {} watcher", kind);

    let mapper_resource = resource.clone();
    let controller_config = ControllerConfig::default().concurrency(workers);

    Controller::new_with(parents, watcher::Config::default(), resource)
        .watches_with(images, (), watcher::Config::default(), move |image: Image| {
            controller_of(&image, &mapper_resource)
        })
        .with_config(controller_config)
        .graceful_shutdown_on(shutdown)
        .run(reconcile, error_policy, context)
        .for_each(|res| {
            let kind = kind.clone();
            async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled {} {}", kind, obj),
                    Err(e) => error!("Controller error for {}: {}", kind, e),
                }
            }
        })
        .await;

    info!("{} watcher stopped", kind);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::deployments;
    use crds::ImageSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

    fn owner(api_version: &str, kind: &str, controller: Option<bool>) -> OwnerReference {
        OwnerReference {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            name: "foo".to_string(),
            uid: "deadbeef".to_string(),
            controller,
            block_owner_deletion: controller,
        }
    }

    fn image_owned_by(owners: Vec<OwnerReference>) -> Image {
        Image {
            metadata: ObjectMeta {
                name: Some("foo-00-abcde".to_string()),
                namespace: Some("bar".to_string()),
                owner_references: Some(owners),
                ..Default::default()
            },
            spec: ImageSpec {
                image: "busybox".to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_group_of() {
        assert_eq!(group_of("apps/v1"), "apps");
        assert_eq!(group_of("serving.knative.dev/v1"), "serving.knative.dev");
        assert_eq!(group_of("v1"), "");
    }

    #[test]
    fn test_controller_of_maps_to_owning_parent() {
        let image = image_owned_by(vec![owner("apps/v1", "Deployment", Some(true))]);

        let parent = controller_of(&image, &deployments()).unwrap();
        assert_eq!(parent.name, "foo");
        assert_eq!(parent.namespace.as_deref(), Some("bar"));
    }

    #[test]
    fn test_controller_of_ignores_other_version() {
        let image = image_owned_by(vec![owner("apps/v1beta2", "Deployment", Some(true))]);

        assert!(controller_of(&image, &deployments()).is_some());
    }

    #[test]
    fn test_controller_of_ignores_other_kinds() {
        let image = image_owned_by(vec![owner("apps/v1", "ReplicaSet", Some(true))]);
        assert!(controller_of(&image, &deployments()).is_none());

        let image = image_owned_by(vec![owner("extensions/v1beta1", "Deployment", Some(true))]);
        assert!(controller_of(&image, &deployments()).is_none());
    }

    #[test]
    fn test_controller_of_ignores_non_controller_owners() {
        let image = image_owned_by(vec![owner("apps/v1", "Deployment", None)]);
        assert!(controller_of(&image, &deployments()).is_none());

        let image = image_owned_by(vec![]);
        assert!(controller_of(&image, &deployments()).is_none());
    }
}

//! Main controller implementation.
//!
//! Builds one watcher per configured parent kind. Every watcher gets its own
//! reconciler, store and retry state; the `kube::Client` and the shutdown
//! signal are the only things they share.

use crate::backoff::RetryTracker;
use crate::config::Config;
use crate::error::ControllerError;
use crate::policy::Policy;
use crate::reconciler::Reconciler;
use crate::watcher::{Context, watch_resource};
use crds::Image;
use futures::future::{BoxFuture, Shared};
use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::{self, Scope};
use kube::{Api, Client};
use resource_store::KubeStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// A running watcher for one parent kind
#[derive(Debug)]
struct WatcherHandle {
    kind: String,
    task: JoinHandle<Result<(), ControllerError>>,
}

/// Main controller for image caching.
#[derive(Debug)]
pub struct Controller {
    watchers: Vec<WatcherHandle>,
}

impl Controller {
    /// Resolve every configured kind and start its watcher.
    pub async fn new(
        config: &Config,
        shutdown: Shared<BoxFuture<'static, ()>>,
    ) -> Result<Self, ControllerError> {
        info!("Initializing Image Cache Controller");

        let client = build_client(config).await?;

        let mut watchers = Vec::with_capacity(config.resources.len());
        for gvk in &config.resources {
            let (resource, namespaced) = resolve(&client, gvk).await?;
            watchers.push(make_controller(
                client.clone(),
                resource,
                namespaced,
                config,
                shutdown.clone(),
            ));
        }

        info!("Image Cache Controller initialized with {} watcher(s)", watchers.len());
        Ok(Self { watchers })
    }

    /// Wait for every watcher to stop.
    ///
    /// Watchers run until shutdown; the first one to fail is reported after
    /// the rest have stopped.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("Image Cache Controller running");

        let mut first_error = None;
        for watcher in self.watchers {
            let result = watcher
                .task
                .await
                .map_err(|e| {
                    ControllerError::Watch(format!("{} watcher panicked: {}", watcher.kind, e))
                })
                .and_then(|result| result);
            if let Err(e) = result {
                error!("{} watcher failed: {}", watcher.kind, e);
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

/// Build the API client from `--kubeconfig` and `--master`.
///
/// Without `--kubeconfig` the standard inference applies (in-cluster service
/// account, then `~/.kube/config`).
async fn build_client(config: &Config) -> Result<Client, ControllerError> {
    let mut client_config = match config.kubeconfig.as_deref() {
        Some(paths) => {
            let kubeconfig = read_kubeconfig(paths)?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| ControllerError::ClientConfig(e.to_string()))?
        }
        None => kube::Config::infer()
            .await
            .map_err(|e| ControllerError::ClientConfig(e.to_string()))?,
    };
    if let Some(master) = config.master.as_deref() {
        apply_master(&mut client_config, master)?;
    }
    Ok(Client::try_from(client_config)?)
}

/// Read and merge a `$PATH`-style list of kubeconfig files.
fn read_kubeconfig(paths: &str) -> Result<Kubeconfig, ControllerError> {
    let mut merged: Option<Kubeconfig> = None;
    for path in std::env::split_paths(paths) {
        if path.as_os_str().is_empty() {
            continue;
        }
        let next = Kubeconfig::read_from(&path).map_err(|e| {
            ControllerError::ClientConfig(format!("{}: {}", path.display(), e))
        })?;
        merged = Some(match merged {
            Some(current) => current
                .merge(next)
                .map_err(|e| ControllerError::ClientConfig(e.to_string()))?,
            None => next,
        });
    }
    merged.ok_or_else(|| ControllerError::ClientConfig(format!("no kubeconfig file in {paths:?}")))
}

/// Point the client at another API server.
fn apply_master(client_config: &mut kube::Config, master: &str) -> Result<(), ControllerError> {
    client_config.cluster_url = master.parse().map_err(|e| {
        ControllerError::ClientConfig(format!("invalid API server address {master:?}: {e}"))
    })?;
    Ok(())
}

/// Look up the served resource and scope of a kind.
async fn resolve(
    client: &Client,
    gvk: &GroupVersionKind,
) -> Result<(ApiResource, bool), ControllerError> {
    let (resource, capabilities) = discovery::pinned_kind(client, gvk).await?;
    let namespaced = capabilities.scope == Scope::Namespaced;
    info!(
        "Resolved {}.{}.{} to resource {} ({})",
        gvk.kind,
        gvk.version,
        gvk.group,
        resource.plural,
        if namespaced { "namespaced" } else { "cluster-scoped" }
    );
    Ok((resource, namespaced))
}

/// Start the watcher for one parent kind.
fn make_controller(
    client: Client,
    resource: ApiResource,
    namespaced: bool,
    config: &Config,
    shutdown: Shared<BoxFuture<'static, ()>>,
) -> WatcherHandle {
    let (parents, images): (Api<DynamicObject>, Api<Image>) = match config.namespace.as_deref() {
        Some(ns) if namespaced => (
            Api::namespaced_with(client.clone(), ns, &resource),
            Api::namespaced(client.clone(), ns),
        ),
        _ => (Api::all_with(client.clone(), &resource), Api::all(client.clone())),
    };

    let store = KubeStore::new(client, resource.clone());
    let context = Arc::new(Context {
        reconciler: Reconciler::new(
            Arc::new(store),
            resource.clone(),
            Policy::new(config.annotation_key.clone()),
        ),
        retries: RetryTracker::new(config.backoff_min(), config.backoff_max()),
        resync: config.resync(),
    });

    let workers = config.workers;
    let task = tokio::spawn(async move {
        watch_resource(parents, images, context, workers, shutdown).await
    });

    WatcherHandle {
        kind: resource.kind,
        task,
    }
}

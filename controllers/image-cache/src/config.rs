//! Controller configuration.
//!
//! Every setting is a command-line flag that can also be supplied through an
//! environment variable, so the same binary works from a shell and from a
//! Deployment manifest.

use crate::error::ControllerError;
use crate::policy::DEFAULT_ANNOTATION_KEY;
use clap::Parser;
use kube::api::GroupVersionKind;
use std::time::Duration;
use tracing::info;

/// Reconcile workers per watched kind.
pub const DEFAULT_WORKERS: u16 = 2;

/// Image Cache Controller configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "image-cache-controller", version, about)]
pub struct Config {
    /// Resources to operate over, in the form Kind.version.group (e.g. Deployment.v1.apps).
    /// Repeat the flag or pass a comma-separated list.
    #[arg(
        long = "resource",
        env = "RESOURCES",
        value_delimiter = ',',
        required = true,
        value_parser = parse_gvk
    )]
    pub resources: Vec<GroupVersionKind>,

    /// Kubeconfig file(s) to load, separated like `$PATH`.
    /// In-cluster config or the default kubeconfig is inferred when unset.
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<String>,

    /// Address of the Kubernetes API server, overriding the one in the kubeconfig
    #[arg(long, env = "KUBE_MASTER")]
    pub master: Option<String>,

    /// Namespace to watch (all namespaces when unset)
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub namespace: Option<String>,

    /// Concurrent reconciles per watched kind
    #[arg(long, env = "WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: u16,

    /// Seconds between periodic re-syncs of an unchanged resource
    #[arg(long, env = "RESYNC_SECS", default_value_t = 36_000)]
    pub resync_secs: u64,

    /// Annotation forcing caching on or off for a single resource
    #[arg(long, env = "ANNOTATION_KEY", default_value = DEFAULT_ANNOTATION_KEY)]
    pub annotation_key: String,

    /// First retry delay, in seconds, after a failed reconcile
    #[arg(long, env = "BACKOFF_MIN_SECS", default_value_t = 5)]
    pub backoff_min_secs: u64,

    /// Upper bound, in seconds, of the retry delay
    #[arg(long, env = "BACKOFF_MAX_SECS", default_value_t = 300)]
    pub backoff_max_secs: u64,
}

impl Config {
    /// Check cross-field constraints clap cannot express.
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.resources.is_empty() {
            return Err(ControllerError::InvalidConfig(
                "at least one --resource is required".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(ControllerError::InvalidConfig(
                "--workers must be at least 1".to_string(),
            ));
        }
        if self.backoff_min_secs == 0 || self.backoff_min_secs > self.backoff_max_secs {
            return Err(ControllerError::InvalidConfig(format!(
                "backoff bounds must satisfy 0 < min <= max (got min={}, max={})",
                self.backoff_min_secs, self.backoff_max_secs
            )));
        }
        if self.annotation_key.trim().is_empty() {
            return Err(ControllerError::InvalidConfig(
                "--annotation-key must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Log the effective configuration.
    pub fn log(&self) {
        info!("Configuration:");
        for gvk in &self.resources {
            info!("  Resource: {}.{}.{}", gvk.kind, gvk.version, gvk.group);
        }
        info!("  Kubeconfig: {}", self.kubeconfig.as_deref().unwrap_or("inferred"));
        if let Some(master) = &self.master {
            info!("  API server: {}", master);
        }
        info!("  Namespace: {}", self.namespace.as_deref().unwrap_or("all namespaces"));
        info!("  Workers per resource: {}", self.workers);
        info!("  Resync period: {}s", self.resync_secs);
        info!("  Annotation: {}", self.annotation_key);
        info!("  Backoff: {}s..{}s", self.backoff_min_secs, self.backoff_max_secs);
    }

    /// Requeue delay after a successful reconcile
    pub fn resync(&self) -> Duration {
        Duration::from_secs(self.resync_secs)
    }

    /// First retry delay
    pub fn backoff_min(&self) -> Duration {
        Duration::from_secs(self.backoff_min_secs)
    }

    /// Largest retry delay
    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }
}

/// Parse `Kind.version.group` into a `GroupVersionKind`.
///
/// The group may itself contain dots (`Service.v1.serving.knative.dev`).
/// `Kind.version` and `Kind.version.` both select the core group.
pub fn parse_gvk(value: &str) -> Result<GroupVersionKind, String> {
    let invalid = || format!("not a valid Kind.version.group: {value:?}");
    let (kind, rest) = value.split_once('.').ok_or_else(invalid)?;
    let (version, group) = rest.split_once('.').unwrap_or((rest, ""));
    if kind.is_empty() || version.is_empty() {
        return Err(invalid());
    }
    Ok(GroupVersionKind::gvk(group, version, kind))
}

//! Resource Store
//!
//! Abstraction over the API server that hosts both the parent resources the
//! image cache controller watches and the `Image` resources it derives from
//! them.
//!
//! # Example
//!
//! ```no_run
//! use kube::api::{ApiResource, GroupVersionKind};
//! use resource_store::{KubeStore, LabelSelector, ResourceStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let deployments = ApiResource::from_gvk(&GroupVersionKind::gvk("apps", "v1", "Deployment"));
//! let store = KubeStore::new(client, deployments);
//!
//! // Read a parent
//! let parent = store.get_parent("default", "web").await?;
//!
//! // List the Images labeled for one of its generations
//! let selector = LabelSelector::new()
//!     .equals("controller", "1a2b3c")
//!     .equals("generation", "4");
//! let images = store.list_images("default", &selector).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Typed selectors**: `LabelSelector` renders the Kubernetes selector syntax
//!   and evaluates itself against label maps
//! - **Scoped deletes**: bulk deletes refuse an empty selector
//! - **Mocking**: `MockStore` (feature `test-util`) keeps everything in memory

pub mod client;
pub mod error;
pub mod selector;
#[path = "trait.rs"]
pub mod store_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeStore;
pub use error::StoreError;
pub use selector::{LabelSelector, Requirement};
pub use store_trait::ResourceStore;
#[cfg(feature = "test-util")]
pub use mock::{MockStore, Operation, StoreCall};

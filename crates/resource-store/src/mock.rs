//! Mock ResourceStore for unit testing
//!
//! This module provides an in-memory implementation of `ResourceStore` that
//! can be used in unit tests without a running API server. It evaluates label
//! selectors, assigns generated names and UIDs on create, records every call
//! for ordering assertions and can be told to fail specific operations.

use crate::client::ensure_scoped;
use crate::error::StoreError;
use crate::selector::LabelSelector;
use crate::store_trait::ResourceStore;
use crds::Image;
use kube::api::DynamicObject;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Store operations, used to target injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `get_parent`
    GetParent,
    /// `list_images`
    ListImages,
    /// `create_image`
    CreateImage,
    /// `delete_images`
    DeleteImages,
}

/// A recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs, reason = "fields mirror the trait method arguments")]
pub enum StoreCall {
    /// A parent lookup
    GetParent { namespace: String, name: String },
    /// A selector list of Images
    ListImages { namespace: String, selector: String },
    /// An Image create, identified by its image reference
    CreateImage { namespace: String, image: String },
    /// A selector delete of Images
    DeleteImages { namespace: String, selector: String },
}

impl StoreCall {
    /// The operation this call performed
    pub fn operation(&self) -> Operation {
        match self {
            StoreCall::GetParent { .. } => Operation::GetParent,
            StoreCall::ListImages { .. } => Operation::ListImages,
            StoreCall::CreateImage { .. } => Operation::CreateImage,
            StoreCall::DeleteImages { .. } => Operation::DeleteImages,
        }
    }

    /// Whether this call mutates the store
    pub fn is_write(&self) -> bool {
        matches!(self, StoreCall::CreateImage { .. } | StoreCall::DeleteImages { .. })
    }
}

#[derive(Default)]
struct MockState {
    parents: HashMap<(String, String), DynamicObject>,
    images: Vec<Image>,
    calls: Vec<StoreCall>,
    // operation -> number of calls to let through before failing once
    failures: HashMap<Operation, usize>,
    next_id: u64,
}

impl MockState {
    fn record(&mut self, call: StoreCall) -> Result<(), StoreError> {
        let operation = call.operation();
        self.calls.push(call);
        let fail = match self.failures.get_mut(&operation) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                false
            }
            Some(_) => true,
            None => false,
        };
        if fail {
            self.failures.remove(&operation);
            return Err(StoreError::Unavailable(format!("injected failure on {operation:?}")));
        }
        Ok(())
    }

    fn store_image(&mut self, image: &Image) -> Image {
        self.next_id += 1;
        let id = self.next_id;
        let mut stored = image.clone();
        if stored.metadata.name.is_none() {
            let prefix = stored.metadata.generate_name.as_deref().unwrap_or_default();
            stored.metadata.name = Some(format!("{prefix}{id:05}"));
        }
        stored.metadata.uid = Some(format!("image-uid-{id}"));
        stored.metadata.resource_version = Some(id.to_string());
        self.images.push(stored.clone());
        stored
    }
}

fn labels_of(image: &Image) -> std::collections::BTreeMap<String, String> {
    image.metadata.labels.clone().unwrap_or_default()
}

/// Mock ResourceStore for testing
///
/// Clones share the same in-memory state.
#[derive(Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<MockState>>,
}

impl std::fmt::Debug for MockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("MockStore")
            .field("parents", &state.parents.len())
            .field("images", &state.images.len())
            .field("calls", &state.calls.len())
            .finish()
    }
}

impl MockStore {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parent (for test setup)
    pub fn insert_parent(&self, parent: DynamicObject) {
        let key = (
            parent.metadata.namespace.clone().unwrap_or_default(),
            parent.metadata.name.clone().unwrap_or_default(),
        );
        self.state.lock().unwrap().parents.insert(key, parent);
    }

    /// Remove a parent (for test setup)
    pub fn remove_parent(&self, namespace: &str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .parents
            .remove(&(namespace.to_string(), name.to_string()));
    }

    /// Add an Image directly, bypassing the call log and injected failures
    pub fn insert_image(&self, image: Image) -> Image {
        self.state.lock().unwrap().store_image(&image)
    }

    /// All stored Images, in creation order
    pub fn images(&self) -> Vec<Image> {
        self.state.lock().unwrap().images.clone()
    }

    /// Image references of all stored Images, sorted
    pub fn image_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .images()
            .iter()
            .map(|image| image.spec.image.clone())
            .collect();
        keys.sort();
        keys
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Recorded write calls, in order
    pub fn writes(&self) -> Vec<StoreCall> {
        self.calls().into_iter().filter(StoreCall::is_write).collect()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Let `skip` calls of `operation` succeed, then fail the next one
    pub fn fail_on(&self, operation: Operation, skip: usize) {
        self.state.lock().unwrap().failures.insert(operation, skip);
    }
}

#[async_trait::async_trait]
impl ResourceStore for MockStore {
    async fn get_parent(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.record(StoreCall::GetParent {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })?;
        Ok(state
            .parents
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn list_images(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Image>, StoreError> {
        ensure_scoped(selector)?;
        let mut state = self.state.lock().unwrap();
        state.record(StoreCall::ListImages {
            namespace: namespace.to_string(),
            selector: selector.to_string(),
        })?;
        Ok(state
            .images
            .iter()
            .filter(|image| image.metadata.namespace.as_deref() == Some(namespace))
            .filter(|image| selector.matches(&labels_of(image)))
            .cloned()
            .collect())
    }

    async fn create_image(&self, image: &Image) -> Result<Image, StoreError> {
        let namespace = image.metadata.namespace.clone().ok_or_else(|| {
            StoreError::InvalidRequest(format!("Image for {} has no namespace", image.spec.image))
        })?;
        let mut state = self.state.lock().unwrap();
        state.record(StoreCall::CreateImage {
            namespace,
            image: image.spec.image.clone(),
        })?;
        Ok(state.store_image(image))
    }

    async fn delete_images(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<(), StoreError> {
        ensure_scoped(selector)?;
        let mut state = self.state.lock().unwrap();
        state.record(StoreCall::DeleteImages {
            namespace: namespace.to_string(),
            selector: selector.to_string(),
        })?;
        state.images.retain(|image| {
            image.metadata.namespace.as_deref() != Some(namespace)
                || !selector.matches(&labels_of(image))
        });
        Ok(())
    }
}

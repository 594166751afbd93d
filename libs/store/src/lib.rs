//! Remote object store abstraction.
//!
//! Objects cross this boundary in a generic, schema-flexible form
//! ([`DynamicObject`]) and are addressed by resource type, optional namespace
//! and name. Two backends are provided:
//!
//! - [`ApiServerStore`]: talks to a Kubernetes-style API server over HTTP
//! - [`MemoryStore`]: in-process store with call counters and fault injection
//!
//! No caching or locking happens here; consistency is whatever the backend
//! provides.

use std::sync::Arc;

use async_trait::async_trait;

mod api_server;
mod error;
mod memory;
mod object;
mod resource;

pub use api_server::{ApiServerConfig, ApiServerStore};
pub use error::StoreError;
pub use memory::{MemoryStore, Operation};
pub use object::DynamicObject;
pub use resource::ApiResource;

/// Read/write access to a remote object store.
///
/// `namespace` must be `Some` for namespaced resource types and `None` for
/// cluster-scoped ones.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object by name.
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, StoreError>;

    /// Create an object, returning the stored representation.
    async fn create(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        object: &DynamicObject,
    ) -> Result<DynamicObject, StoreError>;

    /// Delete an object by name.
    async fn delete(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, StoreError> {
        (**self).get(resource, namespace, name).await
    }

    async fn create(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        object: &DynamicObject,
    ) -> Result<DynamicObject, StoreError> {
        (**self).create(resource, namespace, object).await
    }

    async fn delete(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), StoreError> {
        (**self).delete(resource, namespace, name).await
    }
}

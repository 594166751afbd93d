//! In-process object store.
//!
//! Behaves like a remote store for the operations callers depend on: creates
//! are rejected for existing names, server-side metadata is assigned on
//! create, and every call is counted. Errors can be queued per operation to
//! simulate flaky or restricted stores.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::StoreError;
use crate::object::DynamicObject;
use crate::resource::ApiResource;
use crate::ObjectStore;

type ObjectKey = (ApiResource, Option<String>, String);

/// Store operation, for counting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Create,
    Delete,
}

#[derive(Debug, Default)]
struct CallCounts {
    get: AtomicUsize,
    create: AtomicUsize,
    delete: AtomicUsize,
}

impl CallCounts {
    fn counter(&self, op: Operation) -> &AtomicUsize {
        match op {
            Operation::Get => &self.get,
            Operation::Create => &self.create,
            Operation::Delete => &self.delete,
        }
    }
}

/// In-memory [`ObjectStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<ObjectKey, DynamicObject>>,
    faults: Mutex<HashMap<Operation, VecDeque<StoreError>>>,
    calls: CallCounts,
    resource_version: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error to be returned by the next call of `op`.
    ///
    /// Queued errors are returned in order, one per call, before the store
    /// resumes normal behavior.
    pub async fn inject_fault(&self, op: Operation, err: StoreError) {
        self.faults.lock().await.entry(op).or_default().push_back(err);
    }

    /// Number of calls made to `op`, including ones that failed.
    pub fn calls(&self, op: Operation) -> usize {
        self.calls.counter(op).load(Ordering::SeqCst)
    }

    /// Write an object unconditionally, bypassing counters and faults.
    ///
    /// Plays the part of other writers (controllers, status updates).
    pub async fn put(&self, resource: &ApiResource, namespace: Option<&str>, object: DynamicObject) {
        let Some(name) = object.name().map(str::to_string) else {
            return;
        };
        let key = (resource.clone(), namespace.map(str::to_string), name);
        self.objects.write().await.insert(key, object);
    }

    /// Read an object, bypassing counters and faults.
    pub async fn peek(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Option<DynamicObject> {
        let key = (resource.clone(), namespace.map(str::to_string), name.to_string());
        self.objects.read().await.get(&key).cloned()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    async fn begin(&self, op: Operation) -> Result<(), StoreError> {
        self.calls.counter(op).fetch_add(1, Ordering::SeqCst);
        match self.faults.lock().await.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => {
                debug!(operation = ?op, error = %err, "Returning injected fault");
                Err(err)
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, StoreError> {
        self.begin(Operation::Get).await?;
        resource.check_scope(namespace)?;

        self.peek(resource, namespace, name)
            .await
            .ok_or_else(|| StoreError::NotFound {
                resource: resource.to_string(),
                name: name.to_string(),
            })
    }

    async fn create(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        object: &DynamicObject,
    ) -> Result<DynamicObject, StoreError> {
        self.begin(Operation::Create).await?;
        resource.check_scope(namespace)?;

        let name = object
            .name()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| StoreError::InvalidRequest("metadata.name is required".to_string()))?
            .to_string();
        if let (Some(requested), Some(declared)) = (namespace, object.namespace()) {
            if requested != declared {
                return Err(StoreError::InvalidRequest(format!(
                    "object namespace {declared} does not match request namespace {requested}"
                )));
            }
        }

        let key = (resource.clone(), namespace.map(str::to_string), name.clone());
        let mut objects = self.objects.write().await;
        if objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                resource: resource.to_string(),
                name,
            });
        }

        let mut stored = object.clone();
        if let Some(ns) = namespace {
            stored.set_metadata("namespace", Value::String(ns.to_string()));
        }
        stored.set_metadata("uid", Value::String(uuid::Uuid::new_v4().to_string()));
        stored.set_metadata(
            "creationTimestamp",
            Value::String(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
        );
        let version = self.resource_version.fetch_add(1, Ordering::SeqCst) + 1;
        stored.set_metadata("resourceVersion", Value::String(version.to_string()));

        objects.insert(key, stored.clone());
        debug!(resource = %resource, name = %name, "Created object");
        Ok(stored)
    }

    async fn delete(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), StoreError> {
        self.begin(Operation::Delete).await?;
        resource.check_scope(namespace)?;

        let key = (resource.clone(), namespace.map(str::to_string), name.to_string());
        match self.objects.write().await.remove(&key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                resource: resource.to_string(),
                name: name.to_string(),
            }),
        }
    }
}

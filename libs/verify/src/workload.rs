//! Workload readiness readers.

use async_trait::async_trait;
use opcheck_reconcile::{ConvergencePoller, ObservationTarget, PollReport};
use opcheck_store::{ApiResource, ObjectStore};
use serde::Deserialize;
use tracing::debug;

use crate::error::VerifyError;

/// Reports how many replicas of a workload are ready.
#[async_trait]
pub trait WorkloadReader: Send + Sync {
    /// Current ready replica count of `namespace/name`.
    async fn ready_replicas(&self, namespace: &str, name: &str) -> Result<u32, VerifyError>;
}

/// Reads readiness from `apps/v1` Deployment status.
///
/// A Deployment that does not exist yet has no ready replicas; the operator
/// is expected to create it some time after the custom resource appears.
#[derive(Debug, Clone)]
pub struct DeploymentReader<St> {
    store: St,
    resource: ApiResource,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentView {
    #[serde(default)]
    status: DeploymentStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentStatus {
    #[serde(default)]
    ready_replicas: u32,
}

impl<St: ObjectStore> DeploymentReader<St> {
    pub fn new(store: St) -> Self {
        Self {
            store,
            resource: ApiResource::deployment(),
        }
    }
}

#[async_trait]
impl<St: ObjectStore> WorkloadReader for DeploymentReader<St> {
    async fn ready_replicas(&self, namespace: &str, name: &str) -> Result<u32, VerifyError> {
        let identity = || format!("{} {namespace}/{name}", self.resource.kind);
        let object = match self.store.get(&self.resource, Some(namespace), name).await {
            Ok(object) => object,
            Err(e) if e.is_not_found() => {
                debug!(namespace, name, "Deployment not created yet");
                return Ok(0);
            }
            Err(e) => return Err(VerifyError::store(identity(), e)),
        };

        let view: DeploymentView = serde_json::from_value(object.into_value())
            .map_err(|e| VerifyError::schema_mismatch(identity(), e))?;
        Ok(view.status.ready_replicas)
    }
}

/// Wait for `target` to reach its desired ready replica count.
///
/// Store failures count against the poller's failure threshold. A status
/// that no longer decodes ends the wait at once.
pub async fn wait_for_workload<R>(
    poller: &ConvergencePoller,
    reader: &R,
    target: &ObservationTarget,
) -> PollReport
where
    R: WorkloadReader + ?Sized,
{
    poller
        .poll_until_with(target, VerifyError::is_fatal, move || {
            reader.ready_replicas(&target.namespace, &target.name)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    use opcheck_reconcile::{PollConfig, PollOutcome};
    use opcheck_store::{DynamicObject, MemoryStore, Operation, StoreError};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn poller(max_failures: u32) -> ConvergencePoller {
        ConvergencePoller::new(
            PollConfig::new(Duration::from_secs(5), Duration::from_secs(30))
                .with_max_consecutive_failures(max_failures),
        )
        .unwrap()
    }

    async fn put_deployment(store: &MemoryStore, status: serde_json::Value) {
        let mut object = DynamicObject::new(&ApiResource::deployment(), Some("ops"), "agent");
        object.set("status", status);
        store
            .put(&ApiResource::deployment(), Some("ops"), object)
            .await;
    }

    #[tokio::test]
    async fn test_reads_ready_replicas() {
        let store = Arc::new(MemoryStore::new());
        put_deployment(&store, json!({"replicas": 3, "readyReplicas": 2})).await;

        let reader = DeploymentReader::new(Arc::clone(&store));
        assert_eq!(reader.ready_replicas("ops", "agent").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_status_fields_read_as_zero() {
        let store = Arc::new(MemoryStore::new());
        put_deployment(&store, json!({"replicas": 1})).await;

        let reader = DeploymentReader::new(Arc::clone(&store));
        assert_eq!(reader.ready_replicas("ops", "agent").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_deployment_reads_as_zero() {
        let reader = DeploymentReader::new(Arc::new(MemoryStore::new()));
        assert_eq!(reader.ready_replicas("ops", "agent").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_returned() {
        let store = Arc::new(MemoryStore::new());
        store
            .inject_fault(Operation::Get, StoreError::Unavailable("down".to_string()))
            .await;

        let reader = DeploymentReader::new(Arc::clone(&store));
        let err = reader.ready_replicas("ops", "agent").await.unwrap_err();
        assert!(matches!(err.store_error(), Some(StoreError::Unavailable(_))));
        assert_eq!(err.to_string(), "Deployment ops/agent: store unavailable: down");
    }

    #[tokio::test]
    async fn test_malformed_status_is_schema_mismatch() {
        let store = Arc::new(MemoryStore::new());
        put_deployment(&store, json!({"readyReplicas": -1})).await;

        let reader = DeploymentReader::new(Arc::clone(&store));
        let err = reader.ready_replicas("ops", "agent").await.unwrap_err();
        assert!(matches!(err, VerifyError::SchemaMismatch { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_ready_deployment() {
        let store = Arc::new(MemoryStore::new());
        put_deployment(&store, json!({"readyReplicas": 1})).await;

        let reader = DeploymentReader::new(Arc::clone(&store));
        let target = ObservationTarget::new("ops", "agent", 1);
        let report = wait_for_workload(&poller(3), &reader, &target).await;

        assert_eq!(report.outcome, PollOutcome::Converged);
        assert_eq!(report.samples, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_stops_on_undecodable_status() {
        let store = Arc::new(MemoryStore::new());
        put_deployment(&store, json!({"readyReplicas": "three"})).await;

        let reader = DeploymentReader::new(Arc::clone(&store));
        let target = ObservationTarget::new("ops", "agent", 1);
        let report = wait_for_workload(&poller(10), &reader, &target).await;

        assert!(
            matches!(report.outcome, PollOutcome::ObservationError(ref d) if d.starts_with("schema mismatch for Deployment ops/agent")),
            "{report}"
        );
        assert_eq!(report.samples, 1);
        assert_eq!(store.calls(Operation::Get), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_retries_store_failures() {
        let store = Arc::new(MemoryStore::new());
        put_deployment(&store, json!({"readyReplicas": 1})).await;
        store
            .inject_fault(Operation::Get, StoreError::Unavailable("down".to_string()))
            .await;

        let reader = DeploymentReader::new(Arc::clone(&store));
        let target = ObservationTarget::new("ops", "agent", 1);
        let report = wait_for_workload(&poller(3), &reader, &target).await;

        assert_eq!(report.outcome, PollOutcome::Converged);
        assert_eq!(report.samples, 2);
        assert_eq!(report.last_error.as_deref(), Some("Deployment ops/agent: store unavailable: down"));
    }
}

//! End-to-end operator check.
//!
//! Runs the full ensure-then-converge flow against an in-memory store with a
//! simulated operator that turns the custom resource into a Deployment and
//! brings its replicas up one at a time:
//!
//! 1. Fresh cluster: the resource is created and the workload converges
//! 2. Rerun: the resource is left alone and the workload is still checked
//! 3. No operator running: the wait times out
//! 4. Live resource drifted from the expected schema
//! 5. Interrupted wait
//! 6. Supporting RBAC objects are present
//! 7. The operator's own Deployment becomes ready
//!
//! ## Running
//!
//! ```bash
//! cargo test -p opcheck-e2e --test operator_check
//! ```

use std::sync::Arc;
use std::time::Duration;

use opcheck_reconcile::{ConvergencePoller, ObservationTarget, PollConfig, PollOutcome};
use opcheck_store::{ApiResource, DynamicObject, MemoryStore, Operation};
use opcheck_verify::{
    check_present, wait_for_workload, DeploymentReader, DesiredResource, EnsureOutcome,
    OperatorCheck, VerifyError,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const NAMESPACE: &str = "openshift-ocm-agent-operator";
const NAME: &str = "ocm-agent";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentConfig {
    ocm_base_url: String,
    services: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OcmAgentSpec {
    agent_config: AgentConfig,
    ocm_agent_config: String,
    ocm_agent_image: String,
    token_secret: String,
    replicas: u32,
}

fn ocm_agent_resource() -> ApiResource {
    ApiResource::namespaced("ocmagent.managed.openshift.io", "v1alpha1", "OcmAgent", "ocmagents")
}

fn desired_agent(replicas: u32) -> DesiredResource<OcmAgentSpec> {
    let spec = OcmAgentSpec {
        agent_config: AgentConfig {
            ocm_base_url: "https://api.stage.openshift.com".to_string(),
            services: vec!["service_logs".to_string()],
        },
        ocm_agent_config: "ocm-agent-config".to_string(),
        ocm_agent_image: "quay.io/app-sre/ocm-agent:latest".to_string(),
        token_secret: "ocm-access-token".to_string(),
        replicas,
    };
    DesiredResource::new(ocm_agent_resource(), NAMESPACE, NAME, spec)
        .unwrap()
        .with_labels([("app.kubernetes.io/managed-by", "opcheck-e2e")])
}

fn poll_config() -> PollConfig {
    PollConfig::new(Duration::from_secs(5), Duration::from_secs(120))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Simulated operator: creates a Deployment for each OcmAgent and raises its
/// ready replicas by one per tick until it matches the requested count.
fn spawn_operator(store: Arc<MemoryStore>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let agents = ocm_agent_resource();
        let deployments = ApiResource::deployment();

        loop {
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = tokio::time::sleep(Duration::from_secs(3)) => {}
            }

            let Some(agent) = store.peek(&agents, Some(NAMESPACE), NAME).await else {
                continue;
            };
            let wanted = agent
                .pointer(&["spec", "replicas"])
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(1);

            let ready = store
                .peek(&deployments, Some(NAMESPACE), NAME)
                .await
                .and_then(|d| d.pointer(&["status", "readyReplicas"]).and_then(|v| v.as_u64()));

            let next = match ready {
                None => 0,
                Some(n) if n < wanted => n + 1,
                Some(_) => continue,
            };

            let mut deployment = DynamicObject::new(&deployments, Some(NAMESPACE), NAME);
            deployment.set("status", serde_json::json!({ "readyReplicas": next }));
            store.put(&deployments, Some(NAMESPACE), deployment).await;
            tracing::debug!(ready = next, wanted, "operator reconciled deployment");
        }
    })
}

#[tokio::test(start_paused = true)]
async fn test_operator_check_creates_and_converges() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let operator = spawn_operator(store.clone(), shutdown_rx);

    let check = OperatorCheck::new(store.clone(), DeploymentReader::new(store.clone()), poll_config())
        .unwrap();
    let desired = desired_agent(2);
    let target = ObservationTarget::new(NAMESPACE, NAME, 2);

    // First run creates the resource and waits for the operator.
    let report = check.run(&desired, &target).await.unwrap();
    assert_eq!(report.ensured, EnsureOutcome::Created);
    assert_eq!(report.poll.outcome, PollOutcome::Converged);
    assert_eq!(report.poll.last_observed, Some(2));
    assert!(report.poll.samples > 1);
    assert!(report.is_success(), "{report}");

    // The created object carries the typed spec and labels.
    let live = store
        .peek(&ocm_agent_resource(), Some(NAMESPACE), NAME)
        .await
        .expect("resource created");
    assert!(live.uid().is_some());
    assert_eq!(
        live.pointer(&["metadata", "labels", "app.kubernetes.io/managed-by"]),
        Some(&serde_json::json!("opcheck-e2e"))
    );
    let fetched = check.ensurer().fetch(&desired).await.unwrap().unwrap();
    assert_eq!(fetched.spec(), desired.spec());

    // Second run finds it and still checks the workload.
    let rerun = check.run(&desired, &target).await.unwrap();
    assert_eq!(rerun.ensured, EnsureOutcome::Existed);
    assert_eq!(rerun.poll.outcome, PollOutcome::Converged);
    assert_eq!(rerun.poll.samples, 1);
    assert_eq!(store.calls(Operation::Create), 1);

    shutdown_tx.send(true).unwrap();
    operator.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_operator_check_times_out_without_operator() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let config = PollConfig::new(Duration::from_secs(5), Duration::from_secs(30));

    let check =
        OperatorCheck::new(store.clone(), DeploymentReader::new(store.clone()), config.clone())
            .unwrap();
    let report = check
        .run(&desired_agent(1), &ObservationTarget::new(NAMESPACE, NAME, 1))
        .await
        .unwrap();

    assert_eq!(report.ensured, EnsureOutcome::Created);
    assert_eq!(report.poll.outcome, PollOutcome::TimedOut);
    assert_eq!(report.poll.last_observed, Some(0));
    assert!(u64::from(report.poll.samples) <= config.max_samples());
    assert!(report.poll.elapsed >= Duration::from_secs(30));
    assert!(report.poll.elapsed < Duration::from_secs(35));
    assert!(!report.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_operator_check_rejects_drifted_resource() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let resource = ocm_agent_resource();

    let mut drifted = DynamicObject::new(&resource, Some(NAMESPACE), NAME);
    drifted.set("spec", serde_json::json!({ "ocmAgentImage": 42 }));
    store.put(&resource, Some(NAMESPACE), drifted).await;

    let check =
        OperatorCheck::new(store.clone(), DeploymentReader::new(store.clone()), poll_config())
            .unwrap();
    let err = check
        .run(&desired_agent(1), &ObservationTarget::new(NAMESPACE, NAME, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, VerifyError::SchemaMismatch { .. }), "{err}");
    assert_eq!(store.calls(Operation::Create), 0);
}

#[tokio::test(start_paused = true)]
async fn test_operator_check_interrupted() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let (cancel_tx, cancel_rx) = watch::channel(false);

    let check =
        OperatorCheck::new(store.clone(), DeploymentReader::new(store.clone()), poll_config())
            .unwrap()
            .with_cancellation(cancel_rx);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        let _ = cancel_tx.send(true);
    });

    let report = check
        .run(&desired_agent(1), &ObservationTarget::new(NAMESPACE, NAME, 1))
        .await
        .unwrap();

    assert_eq!(report.poll.outcome, PollOutcome::Cancelled);
    assert!(report.poll.elapsed >= Duration::from_secs(12));
    assert!(report.poll.elapsed < Duration::from_secs(17));
}

#[tokio::test]
async fn test_supporting_rbac_present() {
    init_tracing();
    let store = MemoryStore::new();

    for (resource, name) in [
        (ApiResource::cluster_role(), "ocm-agent-operator"),
        (ApiResource::cluster_role(), "ocm-agent"),
        (ApiResource::cluster_role_binding(), "ocm-agent-operator"),
    ] {
        store
            .put(&resource, None, DynamicObject::new(&resource, None, name))
            .await;
    }

    let roles = check_present(
        &store,
        &ApiResource::cluster_role(),
        None,
        &["ocm-agent-operator".to_string(), "ocm-agent".to_string()],
    )
    .await
    .unwrap();
    assert!(roles.all_present());

    let bindings = check_present(
        &store,
        &ApiResource::cluster_role_binding(),
        None,
        &["ocm-agent-operator".to_string(), "ocm-agent".to_string()],
    )
    .await
    .unwrap();
    assert!(!bindings.all_present());
    assert_eq!(bindings.missing, vec!["ocm-agent".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_operator_deployment_becomes_ready() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let deployments = ApiResource::deployment();

    let rollout = {
        let store = Arc::clone(&store);
        let deployments = deployments.clone();
        tokio::spawn(async move {
            for ready in 0..=1 {
                let mut deployment =
                    DynamicObject::new(&deployments, Some(NAMESPACE), "ocm-agent-operator");
                deployment.set("status", serde_json::json!({ "readyReplicas": ready }));
                store.put(&deployments, Some(NAMESPACE), deployment).await;
                tokio::time::sleep(Duration::from_secs(8)).await;
            }
        })
    };

    let poller = ConvergencePoller::new(poll_config()).unwrap();
    let reader = DeploymentReader::new(Arc::clone(&store));
    let target = ObservationTarget::new(NAMESPACE, "ocm-agent-operator", 1);

    let report = wait_for_workload(&poller, &reader, &target).await;

    assert_eq!(report.outcome, PollOutcome::Converged, "{report}");
    assert!(report.elapsed >= Duration::from_secs(8));
    assert!(report.elapsed < Duration::from_secs(15));
    rollout.await.unwrap();
}

//! HTTP behavior of the API server backend against a mock server.

use opcheck_store::{ApiResource, ApiServerConfig, ApiServerStore, DynamicObject, ObjectStore, StoreError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AGENT_PATH: &str =
    "/apis/ocmagent.managed.openshift.io/v1alpha1/namespaces/ops/ocmagents/ocm-agent";
const AGENT_COLLECTION: &str =
    "/apis/ocmagent.managed.openshift.io/v1alpha1/namespaces/ops/ocmagents";

fn agent_resource() -> ApiResource {
    ApiResource::namespaced("ocmagent.managed.openshift.io", "v1alpha1", "OcmAgent", "ocmagents")
}

fn store(server: &MockServer, token: Option<&str>) -> ApiServerStore {
    let mut config = ApiServerConfig::new(server.uri());
    config.token = token.map(str::to_string);
    ApiServerStore::new(&config).unwrap()
}

fn status_body(code: u16, reason: &str, message: &str) -> serde_json::Value {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "reason": reason,
        "message": message,
        "code": code,
    })
}

#[tokio::test]
async fn test_get_returns_object() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AGENT_PATH))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "apiVersion": "ocmagent.managed.openshift.io/v1alpha1",
            "kind": "OcmAgent",
            "metadata": {"name": "ocm-agent", "namespace": "ops", "uid": "abc"},
            "spec": {"replicas": 1},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let object = store(&server, Some("secret"))
        .get(&agent_resource(), Some("ops"), "ocm-agent")
        .await
        .unwrap();

    assert_eq!(object.name(), Some("ocm-agent"));
    assert_eq!(object.uid(), Some("abc"));
    assert_eq!(object.pointer(&["spec", "replicas"]), Some(&json!(1)));
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AGENT_PATH))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(status_body(404, "NotFound", "not found")),
        )
        .mount(&server)
        .await;

    let err = store(&server, None)
        .get(&agent_resource(), Some("ops"), "ocm-agent")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_get_forbidden_carries_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AGENT_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(status_body(
            403,
            "Forbidden",
            "ocmagents is forbidden: User \"ci\" cannot get resource",
        )))
        .mount(&server)
        .await;

    let err = store(&server, None)
        .get(&agent_resource(), Some("ops"), "ocm-agent")
        .await
        .unwrap_err();

    match err {
        StoreError::Forbidden(message) => assert!(message.contains("cannot get resource")),
        other => panic!("expected Forbidden, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_error_body_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AGENT_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = store(&server, None)
        .get(&agent_resource(), Some("ops"), "ocm-agent")
        .await
        .unwrap_err();

    assert!(err.is_transient());
    assert!(err.to_string().contains("bad gateway"));
}

#[tokio::test]
async fn test_create_posts_to_collection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(AGENT_COLLECTION))
        .and(body_partial_json(json!({
            "kind": "OcmAgent",
            "metadata": {"name": "ocm-agent"},
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "apiVersion": "ocmagent.managed.openshift.io/v1alpha1",
            "kind": "OcmAgent",
            "metadata": {"name": "ocm-agent", "namespace": "ops", "uid": "new-uid"},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resource = agent_resource();
    let object = DynamicObject::new(&resource, Some("ops"), "ocm-agent");
    let created = store(&server, None)
        .create(&resource, Some("ops"), &object)
        .await
        .unwrap();

    assert_eq!(created.uid(), Some("new-uid"));
}

#[tokio::test]
async fn test_create_conflict_is_already_exists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(AGENT_COLLECTION))
        .respond_with(ResponseTemplate::new(409).set_body_json(status_body(
            409,
            "AlreadyExists",
            "ocmagents \"ocm-agent\" already exists",
        )))
        .mount(&server)
        .await;

    let resource = agent_resource();
    let object = DynamicObject::new(&resource, Some("ops"), "ocm-agent");
    let err = store(&server, None)
        .create(&resource, Some("ops"), &object)
        .await
        .unwrap_err();

    assert!(err.is_already_exists());
}

#[tokio::test]
async fn test_delete() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(AGENT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(200, "", "")))
        .expect(1)
        .mount(&server)
        .await;

    store(&server, None)
        .delete(&agent_resource(), Some("ops"), "ocm-agent")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_scope_checked_before_request() {
    let server = MockServer::start().await;

    let err = store(&server, None)
        .get(&agent_resource(), None, "ocm-agent")
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::InvalidRequest(_)));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

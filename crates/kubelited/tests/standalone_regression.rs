//! Standalone regression tests.
//!
//! Drives the full router against on-disk stores with a running dispatcher:
//! namespaces, ConfigMaps and Secrets through create, read, replace, list
//! and delete, plus the always-empty event lists.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::sync::watch;
use tower::ServiceExt;

use kubelite_api::{ApiState, build_router};
use kubelite_core::constants::DEFAULT_NAMESPACE;
use kubelite_dispatch::{Dispatcher, StoreApplier};
use kubelite_store::{FileSystemStore, NamespaceRecord, NamespaceStore, ResourceKind, StoreOptions};

struct Harness {
    dir: TempDir,
    router: Router,
    configmaps: FileSystemStore,
    _shutdown: watch::Sender<bool>,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let configmaps = FileSystemStore::open(
        dir.path().join("configmaps"),
        ResourceKind::ConfigMap,
        StoreOptions::default(),
    )
    .unwrap();
    let secrets = FileSystemStore::open(
        dir.path().join("secrets"),
        ResourceKind::Secret,
        StoreOptions::default(),
    )
    .unwrap();
    let namespaces = NamespaceStore::open(dir.path().join("namespaces")).unwrap();
    namespaces
        .ensure(&NamespaceRecord::new(DEFAULT_NAMESPACE, "default-uid"))
        .unwrap();

    let (dispatcher, handle) = Dispatcher::new(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let applier = Arc::new(StoreApplier::new(
        configmaps.clone(),
        secrets.clone(),
        namespaces.clone(),
    ));
    tokio::spawn(dispatcher.run(applier, shutdown_rx));

    let router = build_router(ApiState {
        configmaps: configmaps.clone(),
        secrets,
        namespaces,
        dispatcher: handle,
    });

    Harness {
        dir,
        router,
        configmaps,
        _shutdown: shutdown_tx,
    }
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-request-id", "regression");
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Poll a GET until it returns `expected`; mutations are applied asynchronously.
async fn wait_for(router: &Router, uri: &str, expected: StatusCode) -> Value {
    for _ in 0..200 {
        let (status, body) = send(router, "GET", uri, None).await;
        if status == expected {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{uri} never returned {expected}");
}

#[tokio::test]
async fn healthz() {
    let h = harness();
    let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let resp = h.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn configmap_lifecycle() {
    let h = harness();
    let uri = "/api/v1/namespaces/default/configmaps/app-config";

    let (status, body) = send(
        &h.router,
        "POST",
        "/api/v1/namespaces/default/configmaps",
        Some(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "app-config", "labels": {"env": "prod"}},
            "data": {"A": "1", "B": "2"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["metadata"]["namespace"], "default");

    let body = wait_for(&h.router, uri, StatusCode::OK).await;
    assert_eq!(body["data"]["A"], "1");
    assert_eq!(body["data"]["B"], "2");
    assert_eq!(body["metadata"]["labels"]["env"], "prod");
    assert!(body["metadata"]["labels"].get("namespace.k2d.io/name").is_none());
    let path = body["metadata"]["annotations"]["store.k2d.io/filesystem/path/A"]
        .as_str()
        .unwrap();
    assert!(path.ends_with("default-app-config-k2dcm-A"));
    assert!(body["metadata"]["creationTimestamp"].is_string());

    // Creating it again conflicts.
    let (status, body) = send(
        &h.router,
        "POST",
        "/api/v1/namespaces/default/configmaps",
        Some(json!({"metadata": {"name": "app-config"}, "data": {"A": "1"}})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "Status");
    assert_eq!(body["reason"], "AlreadyExists");

    // Replace overwrites A; B survives because stale keys are kept.
    let (status, _) = send(
        &h.router,
        "PUT",
        uri,
        Some(json!({"metadata": {"name": "app-config"}, "data": {"A": "10"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    for _ in 0..200 {
        if h.configmaps.get("app-config", "default").unwrap().data["A"] == b"10" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let (_, body) = send(&h.router, "GET", uri, None).await;
    assert_eq!(body["data"]["A"], "10");
    assert_eq!(body["data"]["B"], "2");

    let (status, body) = send(&h.router, "GET", "/api/v1/namespaces/default/configmaps", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "ConfigMapList");
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (status, body) = send(&h.router, "DELETE", uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Success");

    let (status, body) = send(&h.router, "GET", uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "configmaps \"app-config\" not found");
}

#[tokio::test]
async fn binary_configmap_values_use_binary_data() {
    let h = harness();
    h.configmaps
        .store(
            &kubelite_store::Resource::new("default", "blob")
                .with_data("raw", vec![0xffu8, 0xfe])
                .with_data("text", "hello"),
        )
        .unwrap();

    let (status, body) = send(&h.router, "GET", "/api/v1/namespaces/default/configmaps/blob", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["text"], "hello");
    assert_eq!(body["binaryData"]["raw"], "//4=");
}

#[tokio::test]
async fn secret_lifecycle() {
    let h = harness();
    let uri = "/api/v1/namespaces/default/secrets/db";

    let (status, body) = send(
        &h.router,
        "POST",
        "/api/v1/namespaces/default/secrets",
        Some(json!({
            "metadata": {"name": "db"},
            "type": "kubernetes.io/basic-auth",
            "data": {"username": "YWRtaW4="},
            "stringData": {"password": "hunter2"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["type"], "kubernetes.io/basic-auth");

    let body = wait_for(&h.router, uri, StatusCode::OK).await;
    assert_eq!(body["type"], "kubernetes.io/basic-auth");
    assert_eq!(body["data"]["username"], "YWRtaW4=");
    assert_eq!(body["data"]["password"], "aHVudGVyMg==");
    assert!(body.get("stringData").is_none());
    assert!(body["metadata"].get("labels").is_none());

    let (status, body) = send(&h.router, "GET", "/api/v1/secrets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "SecretList");
    assert_eq!(body["items"][0]["metadata"]["namespace"], "default");

    let (status, _) = send(&h.router, "DELETE", uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&h.router, "GET", uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn namespace_lifecycle_scopes_resources() {
    let h = harness();

    for ns in ["team-a", "team-a-b"] {
        let (status, body) = send(
            &h.router,
            "POST",
            "/api/v1/namespaces",
            Some(json!({"metadata": {"name": ns}})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["metadata"]["resourceVersion"], "1");
        assert!(body["metadata"]["uid"].is_string());
    }
    wait_for(&h.router, "/api/v1/namespaces/team-a", StatusCode::OK).await;
    wait_for(&h.router, "/api/v1/namespaces/team-a-b", StatusCode::OK).await;

    for ns in ["team-a", "team-a-b"] {
        let (status, _) = send(
            &h.router,
            "POST",
            &format!("/api/v1/namespaces/{ns}/configmaps"),
            Some(json!({"metadata": {"name": "app"}, "data": {"K": ns}})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        wait_for(
            &h.router,
            &format!("/api/v1/namespaces/{ns}/configmaps/app"),
            StatusCode::OK,
        )
        .await;
    }

    // Listing team-a must not pick up team-a-b's resource.
    let (_, body) = send(&h.router, "GET", "/api/v1/namespaces/team-a/configmaps", None).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["data"]["K"], "team-a");

    let (_, body) = send(&h.router, "GET", "/api/v1/configmaps", None).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let (status, body) = send(&h.router, "DELETE", "/api/v1/namespaces/team-a", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["phase"], "Terminating");

    wait_for(&h.router, "/api/v1/namespaces/team-a", StatusCode::NOT_FOUND).await;
    assert!(h.configmaps.list("team-a").unwrap().is_empty());
    assert_eq!(h.configmaps.list("team-a-b").unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_namespace_and_invalid_input() {
    let h = harness();

    let (status, _) = send(&h.router, "GET", "/api/v1/namespaces/ghost/configmaps", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &h.router,
        "POST",
        "/api/v1/namespaces/default/configmaps",
        Some(json!({"metadata": {"name": "bad-k2dcm-name"}, "data": {"A": "1"}})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["reason"], "Invalid");

    let (status, _) = send(&h.router, "DELETE", "/api/v1/namespaces/default", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn namespace_path_cannot_escape_the_store() {
    let h = harness();
    let outside = h.dir.path().join("victim.json");
    std::fs::write(
        &outside,
        serde_json::to_vec(&NamespaceRecord::new("victim", "victim-uid")).unwrap(),
    )
    .unwrap();

    for method in ["GET", "DELETE"] {
        let (status, _) = send(&h.router, method, "/api/v1/namespaces/..%2Fvictim", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method}");
    }
    let (status, _) = send(&h.router, "GET", "/api/v1/namespaces/..%2Fvictim/configmaps", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(outside.exists());
}

#[tokio::test]
async fn overlong_name_is_rejected_up_front() {
    let h = harness();
    let name = "a".repeat(240);
    let (status, body) = send(
        &h.router,
        "POST",
        "/api/v1/namespaces/default/configmaps",
        Some(json!({"metadata": {"name": name}, "data": {"A": "1"}})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["reason"], "Invalid");
    assert!(h.configmaps.list("default").unwrap().is_empty());
}

#[tokio::test]
async fn events_are_always_empty() {
    let h = harness();

    let (status, body) = send(&h.router, "GET", "/api/v1/events", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "EventList");
    assert!(body["items"].as_array().unwrap().is_empty());

    let (status, body) = send(&h.router, "GET", "/api/v1/namespaces/default/events", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "EventList");

    let (status, _) = send(&h.router, "GET", "/api/v1/namespaces/ghost/events", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dry_run_persists_nothing() {
    let h = harness();
    let (status, _) = send(
        &h.router,
        "POST",
        "/api/v1/namespaces/default/configmaps?dryRun=All",
        Some(json!({"metadata": {"name": "preview"}, "data": {"A": "1"}})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Any non-empty dryRun value counts.
    let (status, _) = send(
        &h.router,
        "POST",
        "/api/v1/namespaces/default/configmaps?dryRun=true",
        Some(json!({"metadata": {"name": "preview-2"}, "data": {"A": "1"}})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.configmaps.get("preview", "default").unwrap_err().is_not_found());
    assert!(h.configmaps.get("preview-2", "default").unwrap_err().is_not_found());
}

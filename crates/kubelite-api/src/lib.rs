//! kubelite-api — Kubernetes-compatible REST API for kubelite.
//!
//! Serves namespaces, ConfigMaps and Secrets, plus empty event lists. Mutations are validated and
//! handed to the dispatcher; reads and deletes hit the stores directly.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/healthz` | Liveness probe |
//! | GET, POST | `/api/v1/namespaces` | List / create namespaces |
//! | GET, DELETE | `/api/v1/namespaces/{ns}` | Get / delete a namespace |
//! | GET | `/api/v1/events` | Events in all namespaces (always empty) |
//! | GET | `/api/v1/namespaces/{ns}/events` | Events of one namespace (always empty) |
//! | GET | `/api/v1/configmaps` | ConfigMaps in all namespaces |
//! | GET, POST | `/api/v1/namespaces/{ns}/configmaps` | List / create ConfigMaps |
//! | GET, PUT, DELETE | `/api/v1/namespaces/{ns}/configmaps/{name}` | Get / replace / delete |
//! | GET | `/api/v1/secrets` | Secrets in all namespaces |
//! | GET, POST | `/api/v1/namespaces/{ns}/secrets` | List / create Secrets |
//! | GET, PUT, DELETE | `/api/v1/namespaces/{ns}/secrets/{name}` | Get / replace / delete |

pub mod configmap_handlers;
pub mod convert;
pub mod error;
pub mod handlers;
pub mod secret_handlers;
pub mod types;

use axum::Router;
use axum::routing::get;
use kubelite_dispatch::DispatcherHandle;
use kubelite_store::{FileSystemStore, NamespaceStore};

pub use error::{ApiError, ApiResult};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub configmaps: FileSystemStore,
    pub secrets: FileSystemStore,
    pub namespaces: NamespaceStore,
    pub dispatcher: DispatcherHandle,
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route(
            "/namespaces",
            get(handlers::list_namespaces).post(handlers::create_namespace),
        )
        .route(
            "/namespaces/{ns}",
            get(handlers::get_namespace).delete(handlers::delete_namespace),
        )
        .route("/events", get(handlers::list_all_events))
        .route("/namespaces/{ns}/events", get(handlers::list_events))
        .route("/configmaps", get(configmap_handlers::list_all_configmaps))
        .route(
            "/namespaces/{ns}/configmaps",
            get(configmap_handlers::list_configmaps).post(configmap_handlers::create_configmap),
        )
        .route(
            "/namespaces/{ns}/configmaps/{name}",
            get(configmap_handlers::get_configmap)
                .put(configmap_handlers::replace_configmap)
                .delete(configmap_handlers::delete_configmap),
        )
        .route("/secrets", get(secret_handlers::list_all_secrets))
        .route(
            "/namespaces/{ns}/secrets",
            get(secret_handlers::list_secrets).post(secret_handlers::create_secret),
        )
        .route(
            "/namespaces/{ns}/secrets/{name}",
            get(secret_handlers::get_secret)
                .put(secret_handlers::replace_secret)
                .delete(secret_handlers::delete_secret),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(handlers::healthz))
}

/// Stores under a temp dir with the `default` namespace registered, and a
/// dispatcher that is never run so queued operations stay observable.
#[cfg(test)]
pub(crate) fn test_state() -> (tempfile::TempDir, ApiState) {
    use kubelite_core::constants::DEFAULT_NAMESPACE;
    use kubelite_dispatch::Dispatcher;
    use kubelite_store::{NamespaceRecord, ResourceKind, StoreOptions};

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
        .create(&NamespaceRecord::new(DEFAULT_NAMESPACE, "default-uid"))
        .unwrap();
    let (_dispatcher, handle) = Dispatcher::new(16);

    let state = ApiState {
        configmaps,
        secrets,
        namespaces,
        dispatcher: handle,
    };
    (dir, state)
}

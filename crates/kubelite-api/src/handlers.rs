//! Shared handler plumbing plus the health, namespace and event endpoints.
//!
//! Reads and deletes run directly on the stores (on the blocking pool).
//! Creates and replaces are validated here, submitted to the dispatcher, and
//! answered immediately with the defaulted object.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use kubelite_core::constants::{DEFAULT_NAMESPACE, REQUEST_ID_HEADER};
use kubelite_core::validation::validate_namespace_name;
use kubelite_dispatch::{OperationPayload, Priority};
use kubelite_store::{FileSystemStore, StoreResult};

use crate::ApiState;
use crate::convert::{namespace_to_record, record_to_namespace};
use crate::error::{ApiError, ApiResult};
use crate::types::{Event, List, Namespace, NamespaceStatus};

// ── Plumbing ───────────────────────────────────────────────────

/// Query parameters accepted by mutating endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct MutationParams {
    #[serde(rename = "dryRun")]
    pub dry_run: Option<String>,
}

impl MutationParams {
    /// Any non-empty `dryRun` (in practice `All`) validates without persisting.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run.as_deref().is_some_and(|v| !v.is_empty())
    }
}

/// The caller's `x-request-id`, or a fresh one.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Run a store call on the blocking pool.
pub async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?
        .map_err(ApiError::from)
}

/// A `{ns}` path segment that is not a valid namespace name names no
/// namespace; it never reaches the store.
pub fn check_namespace_param(namespace: &str) -> ApiResult<()> {
    validate_namespace_name(namespace)
        .map_err(|_| ApiError::NotFound(format!("namespaces \"{namespace}\" not found")))
}

/// 404 unless `namespace` is registered.
pub async fn require_namespace(state: &ApiState, namespace: &str) -> ApiResult<()> {
    check_namespace_param(namespace)?;
    let namespaces = state.namespaces.clone();
    let name = namespace.to_string();
    if blocking(move || namespaces.exists(&name)).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound(format!("namespaces \"{namespace}\" not found")))
    }
}

/// Whether `namespace/name` is currently stored.
pub async fn resource_exists(store: &FileSystemStore, name: &str, namespace: &str) -> ApiResult<bool> {
    let store = store.clone();
    let (name, namespace) = (name.to_string(), namespace.to_string());
    match blocking(move || store.get(&name, &namespace)).await {
        Ok(_) => Ok(true),
        Err(ApiError::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Submit a mutation to the dispatcher.
pub fn submit(
    state: &ApiState,
    payload: OperationPayload,
    priority: Priority,
    request_id: &str,
) -> ApiResult<()> {
    let sequence = state.dispatcher.submit(payload, priority, request_id)?;
    debug!(request_id, sequence, "mutation accepted");
    Ok(())
}

// ── Health ─────────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}

// ── Namespaces ─────────────────────────────────────────────────

/// GET /api/v1/namespaces
pub async fn list_namespaces(State(state): State<ApiState>) -> ApiResult<impl IntoResponse> {
    let namespaces = state.namespaces.clone();
    let records = blocking(move || namespaces.list()).await?;
    let items = records.into_iter().map(record_to_namespace).collect();
    Ok(Json(List::<Namespace>::new("Namespace", items)))
}

/// GET /api/v1/namespaces/{ns}
pub async fn get_namespace(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    check_namespace_param(&name)?;
    let namespaces = state.namespaces.clone();
    let record = blocking(move || namespaces.get(&name))
        .await
        .map_err(not_found_as("namespaces"))?;
    Ok(Json(record_to_namespace(record)))
}

/// POST /api/v1/namespaces
pub async fn create_namespace(
    State(state): State<ApiState>,
    Query(params): Query<MutationParams>,
    headers: HeaderMap,
    Json(body): Json<Namespace>,
) -> ApiResult<impl IntoResponse> {
    let request_id = request_id(&headers);
    let record = namespace_to_record(&body, &Uuid::new_v4().to_string())?;

    let namespaces = state.namespaces.clone();
    let name = record.name.clone();
    if blocking(move || namespaces.exists(&name)).await? {
        return Err(ApiError::AlreadyExists(format!(
            "namespaces \"{}\" already exists",
            record.name
        )));
    }

    let response = record_to_namespace(record.clone());
    if !params.is_dry_run() {
        submit(
            &state,
            OperationPayload::CreateNamespace(record),
            Priority::High,
            &request_id,
        )?;
    }
    Ok((StatusCode::CREATED, Json(response)))
}

/// DELETE /api/v1/namespaces/{ns}
///
/// The namespace and everything in it are removed asynchronously; the
/// response shows it as `Terminating`.
pub async fn delete_namespace(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(params): Query<MutationParams>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    check_namespace_param(&name)?;
    if name == DEFAULT_NAMESPACE {
        return Err(ApiError::Forbidden(format!(
            "namespaces \"{name}\" is forbidden: this namespace may not be deleted"
        )));
    }
    let request_id = request_id(&headers);

    let namespaces = state.namespaces.clone();
    let lookup = name.clone();
    let record = blocking(move || namespaces.get(&lookup))
        .await
        .map_err(not_found_as("namespaces"))?;

    let mut response = record_to_namespace(record);
    response.status = Some(NamespaceStatus::terminating());
    if !params.is_dry_run() {
        submit(
            &state,
            OperationPayload::DeleteNamespace { name },
            Priority::Low,
            &request_id,
        )?;
    }
    Ok(Json(response))
}

// ── Events ─────────────────────────────────────────────────────

/// GET /api/v1/events
///
/// No events are recorded; clients such as `kubectl describe` get an empty list.
pub async fn list_all_events() -> impl IntoResponse {
    Json(List::<Event>::new("Event", Vec::new()))
}

/// GET /api/v1/namespaces/{ns}/events
pub async fn list_events(
    State(state): State<ApiState>,
    Path(namespace): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_namespace(&state, &namespace).await?;
    Ok(Json(List::<Event>::new("Event", Vec::new())))
}

/// Rewrite a store `NotFound` into the Kubernetes message form,
/// e.g. `configmaps "app" not found`.
pub fn not_found_as(resource: &'static str) -> impl Fn(ApiError) -> ApiError {
    move |e| match e {
        ApiError::NotFound(detail) => {
            let name = detail.rsplit(['/', ' ']).next().unwrap_or_default();
            ApiError::NotFound(format!("{resource} \"{name}\" not found"))
        }
        other => other,
    }
}

//! Secret endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use chrono::Utc;

use kubelite_dispatch::{OperationPayload, Priority};
use kubelite_store::{Resource, ResourceKind};

use crate::ApiState;
use crate::convert::{format_timestamp, resource_to_secret, secret_to_resource};
use crate::error::{ApiError, ApiResult};
use crate::handlers::{
    MutationParams, blocking, not_found_as, request_id, require_namespace, resource_exists, submit,
};
use crate::types::{List, Secret, Status};

const RESOURCE: &str = "secrets";

fn store_payload(resource: Resource) -> OperationPayload {
    OperationPayload::StoreResource {
        kind: ResourceKind::Secret,
        resource,
    }
}

/// GET /api/v1/secrets
pub async fn list_all_secrets(State(state): State<ApiState>) -> ApiResult<impl IntoResponse> {
    let store = state.secrets.clone();
    let list = blocking(move || store.list_all()).await?;
    let items = list.items.into_iter().map(resource_to_secret).collect();
    Ok(Json(List::<Secret>::new("Secret", items)))
}

/// GET /api/v1/namespaces/{ns}/secrets
pub async fn list_secrets(
    State(state): State<ApiState>,
    Path(namespace): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_namespace(&state, &namespace).await?;
    let store = state.secrets.clone();
    let list = blocking(move || store.list(&namespace)).await?;
    let items = list.items.into_iter().map(resource_to_secret).collect();
    Ok(Json(List::<Secret>::new("Secret", items)))
}

/// GET /api/v1/namespaces/{ns}/secrets/{name}
pub async fn get_secret(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    require_namespace(&state, &namespace).await?;
    let store = state.secrets.clone();
    let resource = blocking(move || store.get(&name, &namespace))
        .await
        .map_err(not_found_as(RESOURCE))?;
    Ok(Json(resource_to_secret(resource)))
}

/// POST /api/v1/namespaces/{ns}/secrets
pub async fn create_secret(
    State(state): State<ApiState>,
    Path(namespace): Path<String>,
    Query(params): Query<MutationParams>,
    headers: HeaderMap,
    Json(body): Json<Secret>,
) -> ApiResult<impl IntoResponse> {
    let request_id = request_id(&headers);
    require_namespace(&state, &namespace).await?;
    let resource = secret_to_resource(&body, &namespace)?;

    if resource_exists(&state.secrets, &resource.name, &namespace).await? {
        return Err(ApiError::AlreadyExists(format!(
            "{RESOURCE} \"{}\" already exists",
            resource.name
        )));
    }

    let mut response = resource_to_secret(resource.clone());
    response.metadata.creation_timestamp = Some(format_timestamp(Utc::now()));
    if !params.is_dry_run() {
        submit(&state, store_payload(resource), Priority::Medium, &request_id)?;
    }
    Ok((StatusCode::CREATED, Json(response)))
}

/// PUT /api/v1/namespaces/{ns}/secrets/{name}
pub async fn replace_secret(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
    Query(params): Query<MutationParams>,
    headers: HeaderMap,
    Json(mut body): Json<Secret>,
) -> ApiResult<impl IntoResponse> {
    let request_id = request_id(&headers);
    require_namespace(&state, &namespace).await?;

    if body.metadata.name.is_empty() {
        body.metadata.name = name.clone();
    } else if body.metadata.name != name {
        return Err(ApiError::BadRequest(format!(
            "the name of the object ({}) does not match the name on the URL ({name})",
            body.metadata.name
        )));
    }
    let resource = secret_to_resource(&body, &namespace)?;

    if !resource_exists(&state.secrets, &name, &namespace).await? {
        return Err(ApiError::NotFound(format!("{RESOURCE} \"{name}\" not found")));
    }

    let response = resource_to_secret(resource.clone());
    if !params.is_dry_run() {
        submit(&state, store_payload(resource), Priority::Medium, &request_id)?;
    }
    Ok(Json(response))
}

/// DELETE /api/v1/namespaces/{ns}/secrets/{name}
pub async fn delete_secret(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
    Query(params): Query<MutationParams>,
) -> ApiResult<impl IntoResponse> {
    require_namespace(&state, &namespace).await?;

    if params.is_dry_run() {
        if !resource_exists(&state.secrets, &name, &namespace).await? {
            return Err(ApiError::NotFound(format!("{RESOURCE} \"{name}\" not found")));
        }
        return Ok(Json(Status::success()));
    }

    let store = state.secrets.clone();
    blocking(move || store.delete(&name, &namespace))
        .await
        .map_err(not_found_as(RESOURCE))?;
    Ok(Json(Status::success()))
}

//! ConfigMap endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use chrono::Utc;

use kubelite_dispatch::{OperationPayload, Priority};
use kubelite_store::ResourceKind;

use crate::ApiState;
use crate::convert::{configmap_to_resource, format_timestamp, resource_to_configmap};
use crate::error::{ApiError, ApiResult};
use crate::handlers::{
    MutationParams, blocking, not_found_as, request_id, require_namespace, resource_exists, submit,
};
use crate::types::{ConfigMap, List, Status};

const RESOURCE: &str = "configmaps";

/// GET /api/v1/configmaps
pub async fn list_all_configmaps(State(state): State<ApiState>) -> ApiResult<impl IntoResponse> {
    let store = state.configmaps.clone();
    let list = blocking(move || store.list_all()).await?;
    let items = list.items.into_iter().map(resource_to_configmap).collect();
    Ok(Json(List::<ConfigMap>::new("ConfigMap", items)))
}

/// GET /api/v1/namespaces/{ns}/configmaps
pub async fn list_configmaps(
    State(state): State<ApiState>,
    Path(namespace): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_namespace(&state, &namespace).await?;
    let store = state.configmaps.clone();
    let list = blocking(move || store.list(&namespace)).await?;
    let items = list.items.into_iter().map(resource_to_configmap).collect();
    Ok(Json(List::<ConfigMap>::new("ConfigMap", items)))
}

/// GET /api/v1/namespaces/{ns}/configmaps/{name}
pub async fn get_configmap(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    require_namespace(&state, &namespace).await?;
    let store = state.configmaps.clone();
    let resource = blocking(move || store.get(&name, &namespace))
        .await
        .map_err(not_found_as(RESOURCE))?;
    Ok(Json(resource_to_configmap(resource)))
}

/// POST /api/v1/namespaces/{ns}/configmaps
pub async fn create_configmap(
    State(state): State<ApiState>,
    Path(namespace): Path<String>,
    Query(params): Query<MutationParams>,
    headers: HeaderMap,
    Json(body): Json<ConfigMap>,
) -> ApiResult<impl IntoResponse> {
    let request_id = request_id(&headers);
    require_namespace(&state, &namespace).await?;
    let resource = configmap_to_resource(&body, &namespace)?;

    if resource_exists(&state.configmaps, &resource.name, &namespace).await? {
        return Err(ApiError::AlreadyExists(format!(
            "{RESOURCE} \"{}\" already exists",
            resource.name
        )));
    }

    let mut response = resource_to_configmap(resource.clone());
    response.metadata.creation_timestamp = Some(format_timestamp(Utc::now()));
    if !params.is_dry_run() {
        submit(
            &state,
            OperationPayload::StoreResource {
                kind: ResourceKind::ConfigMap,
                resource,
            },
            Priority::Medium,
            &request_id,
        )?;
    }
    Ok((StatusCode::CREATED, Json(response)))
}

/// PUT /api/v1/namespaces/{ns}/configmaps/{name}
///
/// Full replacement. Keys missing from the body are dropped only when the
/// store prunes stale keys.
pub async fn replace_configmap(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
    Query(params): Query<MutationParams>,
    headers: HeaderMap,
    Json(mut body): Json<ConfigMap>,
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
    let resource = configmap_to_resource(&body, &namespace)?;

    if !resource_exists(&state.configmaps, &name, &namespace).await? {
        return Err(ApiError::NotFound(format!("{RESOURCE} \"{name}\" not found")));
    }

    let response = resource_to_configmap(resource.clone());
    if !params.is_dry_run() {
        submit(
            &state,
            OperationPayload::StoreResource {
                kind: ResourceKind::ConfigMap,
                resource,
            },
            Priority::Medium,
            &request_id,
        )?;
    }
    Ok(Json(response))
}

/// DELETE /api/v1/namespaces/{ns}/configmaps/{name}
pub async fn delete_configmap(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
    Query(params): Query<MutationParams>,
) -> ApiResult<impl IntoResponse> {
    require_namespace(&state, &namespace).await?;

    if params.is_dry_run() {
        if !resource_exists(&state.configmaps, &name, &namespace).await? {
            return Err(ApiError::NotFound(format!("{RESOURCE} \"{name}\" not found")));
        }
        return Ok(Json(Status::success()));
    }

    let store = state.configmaps.clone();
    blocking(move || store.delete(&name, &namespace))
        .await
        .map_err(not_found_as(RESOURCE))?;
    Ok(Json(Status::success()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_state;
    use crate::types::ObjectMeta;
    use kubelite_store::Resource;

    fn body(name: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: name.into(),
                ..ObjectMeta::default()
            },
            data: [("A".to_string(), "1".to_string())].into(),
            ..ConfigMap::default()
        }
    }

    #[tokio::test]
    async fn create_is_queued_and_echoed() {
        let (_dir, state) = test_state();
        let resp = create_configmap(
            State(state.clone()),
            Path("default".to_string()),
            Query(MutationParams::default()),
            HeaderMap::new(),
            Json(body("app-config")),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(state.dispatcher.pending(), 1);
    }

    #[tokio::test]
    async fn create_in_unknown_namespace_is_not_found() {
        let (_dir, state) = test_state();
        let resp = create_configmap(
            State(state.clone()),
            Path("ghost".to_string()),
            Query(MutationParams::default()),
            HeaderMap::new(),
            Json(body("app-config")),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(state.dispatcher.pending(), 0);
    }

    #[tokio::test]
    async fn create_existing_conflicts() {
        let (_dir, state) = test_state();
        state
            .configmaps
            .store(&Resource::new("default", "app-config").with_data("A", "1"))
            .unwrap();
        let resp = create_configmap(
            State(state),
            Path("default".to_string()),
            Query(MutationParams::default()),
            HeaderMap::new(),
            Json(body("app-config")),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn reserved_token_in_name_is_rejected() {
        let (_dir, state) = test_state();
        let resp = create_configmap(
            State(state.clone()),
            Path("default".to_string()),
            Query(MutationParams::default()),
            HeaderMap::new(),
            Json(body("app-k2dcm-x")),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(state.dispatcher.pending(), 0);
    }

    #[tokio::test]
    async fn replace_requires_existing_and_matching_name() {
        let (_dir, state) = test_state();
        let resp = replace_configmap(
            State(state.clone()),
            Path(("default".to_string(), "app-config".to_string())),
            Query(MutationParams::default()),
            HeaderMap::new(),
            Json(body("app-config")),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        state
            .configmaps
            .store(&Resource::new("default", "app-config").with_data("A", "1"))
            .unwrap();
        let resp = replace_configmap(
            State(state.clone()),
            Path(("default".to_string(), "app-config".to_string())),
            Query(MutationParams::default()),
            HeaderMap::new(),
            Json(body("other")),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = replace_configmap(
            State(state.clone()),
            Path(("default".to_string(), "app-config".to_string())),
            Query(MutationParams::default()),
            HeaderMap::new(),
            Json(body("")),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.dispatcher.pending(), 1);
    }

    #[tokio::test]
    async fn get_list_and_delete_are_synchronous() {
        let (_dir, state) = test_state();
        state
            .configmaps
            .store(&Resource::new("default", "app-config").with_data("A", "1"))
            .unwrap();

        let resp = get_configmap(
            State(state.clone()),
            Path(("default".to_string(), "app-config".to_string())),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = list_configmaps(State(state.clone()), Path("default".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = delete_configmap(
            State(state.clone()),
            Path(("default".to_string(), "app-config".to_string())),
            Query(MutationParams::default()),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(state.configmaps.get("app-config", "default").unwrap_err().is_not_found());

        let resp = delete_configmap(
            State(state),
            Path(("default".to_string(), "app-config".to_string())),
            Query(MutationParams::default()),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

//! Conversions between Kubernetes wire types and store types.
//!
//! ConfigMap `data` carries UTF-8 text and `binaryData` carries base64; the
//! store keeps both as raw bytes under one key space. Secret `data` is base64
//! and `stringData` is plain text merged over it. The Secret type travels as
//! a reserved label.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, SecondsFormat, Utc};

use kubelite_core::constants::SECRET_TYPE_LABEL_KEY;
use kubelite_core::validation::{validate_data_key, validate_namespace_name, validate_object_name};
use kubelite_store::naming::{MAX_FILE_NAME_LEN, data_file_name, metadata_file_name};
use kubelite_store::{NamespaceRecord, Resource, ResourceKind};

use crate::error::{ApiError, ApiResult};
use crate::types::{API_VERSION, ConfigMap, Namespace, NamespaceStatus, ObjectMeta, Secret};

pub const DEFAULT_SECRET_TYPE: &str = "Opaque";

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn object_meta(resource: &Resource) -> ObjectMeta {
    ObjectMeta {
        name: resource.name.clone(),
        namespace: Some(resource.namespace.clone()),
        creation_timestamp: resource.creation_timestamp.map(format_timestamp),
        labels: resource.labels.clone(),
        annotations: resource.annotations.clone(),
        ..ObjectMeta::default()
    }
}

/// The body's namespace, if any, must match the request path.
fn check_namespace(meta: &ObjectMeta, namespace: &str) -> ApiResult<()> {
    match meta.namespace.as_deref() {
        Some(ns) if !ns.is_empty() && ns != namespace => Err(ApiError::BadRequest(format!(
            "the namespace of the provided object ({ns}) does not match the namespace sent on the request ({namespace})"
        ))),
        _ => Ok(()),
    }
}

/// Names and keys that pass validation can still encode to a file name the
/// filesystem refuses; those are rejected before anything is queued.
fn check_file_name(file_name: &str) -> ApiResult<()> {
    if file_name.len() > MAX_FILE_NAME_LEN {
        return Err(ApiError::Invalid(format!(
            "stored file name {file_name:?} would be {} bytes, the limit is {MAX_FILE_NAME_LEN}; use a shorter name or key",
            file_name.len()
        )));
    }
    Ok(())
}

/// Validate name and keys, then build the store resource skeleton.
fn new_resource(kind: ResourceKind, meta: &ObjectMeta, namespace: &str) -> ApiResult<Resource> {
    check_namespace(meta, namespace)?;
    validate_object_name(&meta.name, &[kind.marker()])?;
    check_file_name(&metadata_file_name(kind, &meta.name, namespace))?;

    let mut resource = Resource::new(namespace, &meta.name);
    resource.labels = meta.labels.clone();
    Ok(resource)
}

fn insert_data(resource: &mut Resource, kind: ResourceKind, key: &str, value: Vec<u8>) -> ApiResult<()> {
    validate_data_key(key, &[kind.marker()])?;
    check_file_name(&data_file_name(kind, &resource.name, &resource.namespace, key))?;
    resource.data.insert(key.to_string(), value);
    Ok(())
}

/// A resource without data keys leaves no file behind, so it cannot be stored.
fn require_data(resource: &Resource) -> ApiResult<()> {
    if resource.data.is_empty() {
        return Err(ApiError::Invalid(format!(
            "{}: at least one data key is required",
            resource.qualified_name()
        )));
    }
    Ok(())
}

// ── ConfigMap ──────────────────────────────────────────────────

pub fn configmap_to_resource(cm: &ConfigMap, namespace: &str) -> ApiResult<Resource> {
    let kind = ResourceKind::ConfigMap;
    let mut resource = new_resource(kind, &cm.metadata, namespace)?;

    for (key, value) in &cm.data {
        insert_data(&mut resource, kind, key, value.clone().into_bytes())?;
    }
    for (key, value) in &cm.binary_data {
        if cm.data.contains_key(key) {
            return Err(ApiError::Invalid(format!(
                "data key {key:?} is duplicated in data and binaryData"
            )));
        }
        let bytes = BASE64
            .decode(value)
            .map_err(|e| ApiError::BadRequest(format!("binaryData[{key}] is not valid base64: {e}")))?;
        insert_data(&mut resource, kind, key, bytes)?;
    }

    require_data(&resource)?;
    Ok(resource)
}

pub fn resource_to_configmap(resource: Resource) -> ConfigMap {
    let metadata = object_meta(&resource);
    let mut cm = ConfigMap {
        api_version: API_VERSION.into(),
        kind: ResourceKind::ConfigMap.as_str().into(),
        metadata,
        ..ConfigMap::default()
    };
    for (key, value) in resource.data {
        match String::from_utf8(value) {
            Ok(text) => {
                cm.data.insert(key, text);
            }
            Err(e) => {
                cm.binary_data.insert(key, BASE64.encode(e.into_bytes()));
            }
        }
    }
    cm
}

// ── Secret ─────────────────────────────────────────────────────

pub fn secret_to_resource(secret: &Secret, namespace: &str) -> ApiResult<Resource> {
    let kind = ResourceKind::Secret;
    let mut resource = new_resource(kind, &secret.metadata, namespace)?;

    for (key, value) in &secret.data {
        let bytes = BASE64
            .decode(value)
            .map_err(|e| ApiError::BadRequest(format!("data[{key}] is not valid base64: {e}")))?;
        insert_data(&mut resource, kind, key, bytes)?;
    }
    for (key, value) in &secret.string_data {
        insert_data(&mut resource, kind, key, value.clone().into_bytes())?;
    }

    let secret_type = secret
        .secret_type
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_SECRET_TYPE);
    resource
        .labels
        .insert(SECRET_TYPE_LABEL_KEY.to_string(), secret_type.to_string());

    require_data(&resource)?;
    Ok(resource)
}

pub fn resource_to_secret(mut resource: Resource) -> Secret {
    let secret_type = resource
        .labels
        .remove(SECRET_TYPE_LABEL_KEY)
        .unwrap_or_else(|| DEFAULT_SECRET_TYPE.to_string());
    let metadata = object_meta(&resource);
    Secret {
        api_version: API_VERSION.into(),
        kind: ResourceKind::Secret.as_str().into(),
        metadata,
        secret_type: Some(secret_type),
        data: resource
            .data
            .into_iter()
            .map(|(key, value)| (key, BASE64.encode(value)))
            .collect(),
        string_data: Default::default(),
    }
}

// ── Namespace ──────────────────────────────────────────────────

pub fn namespace_to_record(ns: &Namespace, uid: &str) -> ApiResult<NamespaceRecord> {
    validate_namespace_name(&ns.metadata.name)?;
    let mut record = NamespaceRecord::new(&ns.metadata.name, uid);
    record.labels = ns.metadata.labels.clone();
    Ok(record)
}

pub fn record_to_namespace(record: NamespaceRecord) -> Namespace {
    Namespace {
        api_version: API_VERSION.into(),
        kind: "Namespace".into(),
        metadata: ObjectMeta {
            name: record.name,
            uid: Some(record.uid),
            resource_version: Some("1".into()),
            creation_timestamp: Some(format_timestamp(record.creation_timestamp)),
            labels: record.labels,
            ..ObjectMeta::default()
        },
        status: Some(NamespaceStatus::active()),
    }
}

//! Bind-mount paths derived from path annotations.
//!
//! On read, every data key gets an annotation
//! `store.k2d.io/filesystem/path/{key}` whose value is the absolute path of
//! the key's data file. The container layer mounts these files directly
//! instead of copying their content, which makes the store's file paths a
//! contract with running containers.

use std::collections::BTreeMap;
use std::path::PathBuf;

use kubelite_core::constants::FILE_PATH_ANNOTATION_KEY;

/// Annotation key exposing the host path of `key`.
pub fn bind_annotation_key(key: &str) -> String {
    format!("{FILE_PATH_ANNOTATION_KEY}/{key}")
}

/// Map of data key → host file path, for every path annotation present.
pub fn extract_binds(annotations: &BTreeMap<String, String>) -> BTreeMap<String, PathBuf> {
    let prefix = format!("{FILE_PATH_ANNOTATION_KEY}/");
    annotations
        .iter()
        .filter_map(|(key, value)| {
            let data_key = key.strip_prefix(&prefix)?;
            (!data_key.is_empty()).then(|| (data_key.to_string(), PathBuf::from(value)))
        })
        .collect()
}

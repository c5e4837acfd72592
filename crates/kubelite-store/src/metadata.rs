//! Metadata files: one JSON object of labels per resource.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::fsutil::write_atomic;

/// Serialize `labels` into `dir/file_name`.
pub fn store_metadata(
    dir: &Path,
    file_name: &str,
    labels: &BTreeMap<String, String>,
) -> StoreResult<()> {
    let value = serde_json::to_vec(labels).map_err(|source| StoreError::Encoding {
        file: file_name.to_string(),
        source,
    })?;
    write_atomic(dir, file_name, &value)
}

/// Load the label map from `dir/file_name`.
///
/// A missing file is not an error: callers only read metadata after a data
/// file proved the resource exists, so a missing metadata file means a
/// half-written or half-deleted resource, which still reads with no labels.
pub fn load_metadata(dir: &Path, file_name: &str) -> StoreResult<BTreeMap<String, String>> {
    let path = dir.join(file_name);
    match fs::read(&path) {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Encoding {
            file: path.display().to_string(),
            source,
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(file = %path.display(), "metadata file missing, reading resource without labels");
            Ok(BTreeMap::new())
        }
        Err(source) => Err(StoreError::Io {
            context: format!("unable to read metadata file {}", path.display()),
            source,
        }),
    }
}

//! File naming for stored resources.
//!
//! The file name is the only index the store has:
//!
//! - metadata: `{namespace}-{name}{metadata_suffix}` (e.g. `default-app-k2dcm.metadata`)
//! - data:     `{namespace}-{name}{separator}{key}` (e.g. `default-app-k2dcm-A`)
//!
//! Callers guarantee that names and keys never contain the kind's marker
//! token; under that precondition the encoding is reversible.

use crate::error::{StoreError, StoreResult};
use crate::types::ResourceKind;

/// Longest file name, in bytes, that common Linux filesystems accept.
pub const MAX_FILE_NAME_LEN: usize = 255;

/// `InvalidName` unless `file_name` fits in one directory entry.
pub fn check_file_name_len(file_name: &str) -> StoreResult<()> {
    if file_name.len() > MAX_FILE_NAME_LEN {
        return Err(StoreError::InvalidName(format!(
            "file name {file_name:?} is {} bytes, the limit is {MAX_FILE_NAME_LEN}",
            file_name.len()
        )));
    }
    Ok(())
}

pub fn metadata_file_name(kind: ResourceKind, name: &str, namespace: &str) -> String {
    format!("{namespace}-{name}{}", kind.metadata_suffix())
}

/// Metadata file name for a stem (`{namespace}-{name}`) recovered from a data file.
pub fn metadata_file_name_for_stem(kind: ResourceKind, stem: &str) -> String {
    format!("{stem}{}", kind.metadata_suffix())
}

/// Prefix shared by every data file of one resource and by no other resource's.
pub fn data_file_prefix(kind: ResourceKind, name: &str, namespace: &str) -> String {
    format!("{namespace}-{name}{}", kind.separator())
}

pub fn data_file_name(kind: ResourceKind, name: &str, namespace: &str, key: &str) -> String {
    format!("{}{key}", data_file_prefix(kind, name, namespace))
}

pub fn is_metadata_file(kind: ResourceKind, file_name: &str) -> bool {
    file_name.ends_with(kind.metadata_suffix())
}

/// A data file name split back into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedFileName<'a> {
    /// `{namespace}-{name}`.
    pub stem: &'a str,
    pub key: &'a str,
}

impl<'a> ParsedFileName<'a> {
    /// Recover the resource name, given the namespace the stem belongs to.
    ///
    /// The stem alone is ambiguous since both parts may contain `-`.
    pub fn split_namespace(&self, namespace: &str) -> Option<&'a str> {
        let stem: &'a str = self.stem;
        stem.strip_prefix(namespace)?
            .strip_prefix('-')
            .filter(|name| !name.is_empty())
    }
}

/// Parse a data file name. Metadata files, foreign files without the
/// separator, and names with an empty stem or key yield `None`.
pub fn parse_file_name(kind: ResourceKind, file_name: &str) -> Option<ParsedFileName<'_>> {
    if is_metadata_file(kind, file_name) {
        return None;
    }
    let (stem, key) = file_name.split_once(kind.separator())?;
    if stem.is_empty() || key.is_empty() {
        return None;
    }
    Some(ParsedFileName { stem, key })
}

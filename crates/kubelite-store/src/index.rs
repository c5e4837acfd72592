//! Directory index: one scan of a store directory per operation.
//!
//! Nothing is cached between operations. The index only lives for the
//! duration of one locked store call, so it always reflects the disk.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{StoreResult, io_err};
use crate::naming::parse_file_name;
use crate::types::ResourceKind;

/// A regular file found in the store directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub file_name: String,
    /// Absolute path (the store directory is canonicalized on open).
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DirectoryIndex {
    kind: ResourceKind,
    entries: Vec<IndexEntry>,
}

impl DirectoryIndex {
    /// Enumerate `dir`. Any enumeration failure is returned as is; listing a
    /// directory is expected to work, so nothing is retried.
    ///
    /// Sub-directories, symlinks and non UTF-8 names are skipped. Entries are
    /// sorted by file name so results do not depend on enumeration order.
    pub fn scan(dir: &Path, kind: ResourceKind) -> StoreResult<Self> {
        let read_dir =
            fs::read_dir(dir).map_err(io_err!("unable to read {kind} directory {}", dir.display()))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry =
                entry.map_err(io_err!("unable to read {kind} directory {}", dir.display()))?;
            let file_type = entry
                .file_type()
                .map_err(io_err!("unable to stat {}", entry.path().display()))?;
            if !file_type.is_file() {
                continue;
            }
            let Ok(file_name) = entry.file_name().into_string() else {
                continue;
            };
            entries.push(IndexEntry {
                path: dir.join(&file_name),
                file_name,
            });
        }
        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        Ok(Self { kind, entries })
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Files whose name starts with `prefix` (the data files of one resource).
    pub fn matching<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a IndexEntry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.file_name.starts_with(prefix))
    }

    /// Whether at least one file starts with `prefix`, i.e. the resource exists.
    pub fn has_match(&self, prefix: &str) -> bool {
        self.matching(prefix).next().is_some()
    }

    /// Distinct `{namespace}-{name}` stems of every resource in the directory.
    ///
    /// Only data files contribute: a metadata file on its own does not make a
    /// resource, and a resource with many keys yields one stem.
    pub fn stems(&self) -> BTreeSet<&str> {
        self.entries
            .iter()
            .filter_map(|entry| parse_file_name(self.kind, &entry.file_name))
            .map(|parsed| parsed.stem)
            .collect()
    }

    /// Stems starting with `{namespace}-`.
    ///
    /// This is a superset of the namespace's resources: namespace `a` also
    /// matches stems of namespace `a-b`. Callers confirm ownership through
    /// the namespace label in the metadata file.
    pub fn resource_stems(&self, namespace: &str) -> Vec<String> {
        let prefix = format!("{namespace}-");
        self.stems()
            .into_iter()
            .filter(|stem| stem.starts_with(&prefix))
            .map(str::to_string)
            .collect()
    }
}

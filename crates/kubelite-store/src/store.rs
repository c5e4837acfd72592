//! FileSystemStore — one directory and one lock per resource kind.
//!
//! Every operation holds the store lock for its whole scan-plus-mutate
//! sequence, reads included: the directory index has no snapshot isolation,
//! so an unlocked reader could observe another operation's partial write.
//!
//! Multi-file mutations are ordered so that a failure leaves a detectable
//! half-state:
//!
//! - store: metadata first, then one data file per key. A failure after the
//!   metadata write leaves an orphan metadata file, which is invisible since
//!   existence is decided by data files.
//! - delete: metadata first, then data files. A failure after the metadata
//!   removal leaves a half-deleted resource that still reads (without labels)
//!   and can be deleted again.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use kubelite_core::constants::NAMESPACE_NAME_LABEL_KEY;
use tracing::{debug, warn};

use crate::binds::{bind_annotation_key, extract_binds};
use crate::error::{StoreError, StoreResult, io_err};
use crate::fsutil::write_atomic;
use crate::index::DirectoryIndex;
use crate::metadata::{load_metadata, store_metadata};
use crate::naming::{
    check_file_name_len, data_file_prefix, metadata_file_name, metadata_file_name_for_stem,
};
use crate::types::{Resource, ResourceKind, ResourceList};

/// Behavior switches for a store instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// On update, remove data files for keys absent from the new data map.
    /// When off, keys dropped by an update stay on disk and keep being read.
    pub prune_stale_keys: bool,
}

struct Inner {
    dir: PathBuf,
    kind: ResourceKind,
    options: StoreOptions,
    lock: Mutex<()>,
}

/// Filesystem-backed store for one resource kind.
///
/// `Clone` + `Send` + `Sync`; clones share the same lock.
#[derive(Clone)]
pub struct FileSystemStore {
    inner: Arc<Inner>,
}

impl FileSystemStore {
    /// Open (or create) the store directory for `kind`.
    pub fn open(dir: impl AsRef<Path>, kind: ResourceKind, options: StoreOptions) -> StoreResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .map_err(io_err!("unable to create {kind} directory {}", dir.display()))?;
        // Bind annotations must carry absolute paths.
        let dir = fs::canonicalize(dir)
            .map_err(io_err!("unable to resolve {kind} directory {}", dir.display()))?;
        debug!(%kind, path = %dir.display(), ?options, "store opened");
        Ok(Self {
            inner: Arc::new(Inner {
                dir,
                kind,
                options,
                lock: Mutex::new(()),
            }),
        })
    }

    pub fn kind(&self) -> ResourceKind {
        self.inner.kind
    }

    pub fn path(&self) -> &Path {
        &self.inner.dir
    }

    /// Poisoning is ignored; the lock guards no in-memory state.
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.inner
            .lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn not_found(&self, name: &str, namespace: &str) -> StoreError {
        StoreError::NotFound(format!("{} {namespace}/{name}", self.inner.kind))
    }

    // ── Operations ─────────────────────────────────────────────────

    /// Write (or overwrite) a resource: metadata file, then one file per key.
    ///
    /// Labels are stored with the owning namespace injected. Annotations and
    /// the creation timestamp are not persisted; both are derived on read.
    pub fn store(&self, resource: &Resource) -> StoreResult<()> {
        let _guard = self.lock();
        let kind = self.inner.kind;
        let dir = &self.inner.dir;

        let metadata_file = metadata_file_name(kind, &resource.name, &resource.namespace);
        let prefix = data_file_prefix(kind, &resource.name, &resource.namespace);
        // Nothing is written unless every file name fits.
        check_file_name_len(&metadata_file)?;
        for key in resource.data.keys() {
            check_file_name_len(&format!("{prefix}{key}"))?;
        }

        let mut labels = resource.labels.clone();
        labels.insert(NAMESPACE_NAME_LABEL_KEY.to_string(), resource.namespace.clone());
        store_metadata(dir, &metadata_file, &labels)?;

        for (key, value) in &resource.data {
            write_atomic(dir, &format!("{prefix}{key}"), value)?;
        }

        if self.inner.options.prune_stale_keys {
            let index = DirectoryIndex::scan(dir, kind)?;
            for entry in index.matching(&prefix) {
                let key = &entry.file_name[prefix.len()..];
                if !resource.data.contains_key(key) {
                    fs::remove_file(&entry.path)
                        .map_err(io_err!("unable to remove stale data file {}", entry.file_name))?;
                    debug!(%kind, resource = %resource.qualified_name(), key, "stale key removed");
                }
            }
        }

        debug!(
            %kind,
            resource = %resource.qualified_name(),
            keys = resource.data.len(),
            "resource stored"
        );
        Ok(())
    }

    /// Read one resource. `NotFound` if no data file carries its prefix.
    pub fn get(&self, name: &str, namespace: &str) -> StoreResult<Resource> {
        let _guard = self.lock();
        let index = DirectoryIndex::scan(&self.inner.dir, self.inner.kind)?;
        self.load(&index, name, namespace)?
            .ok_or_else(|| self.not_found(name, namespace))
    }

    /// Read every resource of `namespace`. The first per-resource failure
    /// aborts the whole listing.
    pub fn list(&self, namespace: &str) -> StoreResult<ResourceList> {
        let _guard = self.lock();
        let index = DirectoryIndex::scan(&self.inner.dir, self.inner.kind)?;

        let mut items = Vec::new();
        for stem in index.resource_stems(namespace) {
            let Some(name) = stem
                .strip_prefix(namespace)
                .and_then(|rest| rest.strip_prefix('-'))
            else {
                continue;
            };
            if let Some(resource) = self.load(&index, name, namespace)? {
                items.push(resource);
            }
        }

        Ok(ResourceList {
            kind: self.inner.kind,
            items,
        })
    }

    /// Read every resource of every namespace.
    ///
    /// The namespace of each stem comes from its metadata label; resources
    /// without a readable namespace label (half-deleted) are skipped.
    pub fn list_all(&self) -> StoreResult<ResourceList> {
        let _guard = self.lock();
        let kind = self.inner.kind;
        let index = DirectoryIndex::scan(&self.inner.dir, kind)?;

        let mut items = Vec::new();
        for stem in index.stems() {
            let labels = load_metadata(&self.inner.dir, &metadata_file_name_for_stem(kind, stem))?;
            let Some(namespace) = labels.get(NAMESPACE_NAME_LABEL_KEY) else {
                warn!(%kind, stem, "no namespace label, skipping resource in cluster-wide listing");
                continue;
            };
            let Some(name) = stem
                .strip_prefix(namespace.as_str())
                .and_then(|rest| rest.strip_prefix('-'))
            else {
                warn!(%kind, stem, %namespace, "namespace label does not match file name");
                continue;
            };
            if let Some(resource) = self.load(&index, name, namespace)? {
                items.push(resource);
            }
        }

        Ok(ResourceList { kind, items })
    }

    /// Remove a resource: metadata file first, then every data file.
    ///
    /// If the metadata removal fails nothing else is touched. If a data file
    /// removal fails the resource is left half-deleted and the error is
    /// returned; calling `delete` again finishes the job.
    pub fn delete(&self, name: &str, namespace: &str) -> StoreResult<()> {
        let _guard = self.lock();
        let kind = self.inner.kind;
        let dir = &self.inner.dir;
        let index = DirectoryIndex::scan(dir, kind)?;

        let prefix = data_file_prefix(kind, name, namespace);
        if !index.has_match(&prefix) {
            return Err(self.not_found(name, namespace));
        }

        let metadata_file = metadata_file_name(kind, name, namespace);
        let labels = load_metadata(dir, &metadata_file)?;
        if !owned_by(&labels, namespace) {
            return Err(self.not_found(name, namespace));
        }

        match fs::remove_file(dir.join(&metadata_file)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(%kind, resource = %format!("{namespace}/{name}"), "metadata already removed, finishing delete");
            }
            Err(source) => {
                return Err(StoreError::Io {
                    context: format!("unable to remove {kind} metadata file {metadata_file}"),
                    source,
                });
            }
        }

        for entry in index.matching(&prefix) {
            fs::remove_file(&entry.path)
                .map_err(io_err!("unable to remove {kind} data file {}", entry.file_name))?;
        }

        debug!(%kind, resource = %format!("{namespace}/{name}"), "resource deleted");
        Ok(())
    }

    /// Host paths to bind-mount for each data key of a resource read from
    /// this store.
    pub fn binds(&self, resource: &Resource) -> BTreeMap<String, PathBuf> {
        extract_binds(&resource.annotations)
    }

    // ── Internals ──────────────────────────────────────────────────

    /// Materialize a resource from an index taken under the lock.
    ///
    /// Returns `None` if no data file matches, or if the metadata names a
    /// different owning namespace (file names of `a`/`b-c` and `a-b`/`c`
    /// collide; the label tells them apart).
    fn load(
        &self,
        index: &DirectoryIndex,
        name: &str,
        namespace: &str,
    ) -> StoreResult<Option<Resource>> {
        let kind = self.inner.kind;
        let prefix = data_file_prefix(kind, name, namespace);
        let files: Vec<_> = index.matching(&prefix).collect();
        if files.is_empty() {
            return Ok(None);
        }

        let mut labels = load_metadata(&self.inner.dir, &metadata_file_name(kind, name, namespace))?;
        if !owned_by(&labels, namespace) {
            debug!(%kind, %namespace, name, "files belong to another namespace");
            return Ok(None);
        }
        labels.remove(NAMESPACE_NAME_LABEL_KEY);

        let mut resource = Resource::new(namespace, name);
        resource.labels = labels;

        for entry in files {
            let key = &entry.file_name[prefix.len()..];
            let content = fs::read(&entry.path)
                .map_err(io_err!("unable to read {kind} data file {}", entry.file_name))?;
            let modified: DateTime<Utc> = fs::metadata(&entry.path)
                .and_then(|m| m.modified())
                .map_err(io_err!("unable to get file info for {}", entry.file_name))?
                .into();

            // Earliest modification time among the data files.
            resource.creation_timestamp = Some(match resource.creation_timestamp {
                Some(current) => current.min(modified),
                None => modified,
            });
            resource.annotations.insert(
                bind_annotation_key(key),
                entry.path.to_string_lossy().into_owned(),
            );
            resource.data.insert(key.to_string(), content);
        }

        Ok(Some(resource))
    }
}

/// A missing namespace label (half-deleted resource) does not disprove ownership.
fn owned_by(labels: &BTreeMap<String, String>, namespace: &str) -> bool {
    labels
        .get(NAMESPACE_NAME_LABEL_KEY)
        .is_none_or(|owner| owner == namespace)
}

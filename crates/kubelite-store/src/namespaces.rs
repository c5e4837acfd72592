//! NamespaceStore — one JSON file per namespace.
//!
//! Same locking model as [`FileSystemStore`](crate::FileSystemStore): one
//! lock for the whole store, held for every operation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::{StoreError, StoreResult, io_err};
use crate::fsutil::write_atomic;
use crate::types::NamespaceRecord;

const RECORD_SUFFIX: &str = ".json";

struct Inner {
    dir: PathBuf,
    lock: Mutex<()>,
}

#[derive(Clone)]
pub struct NamespaceStore {
    inner: Arc<Inner>,
}

impl NamespaceStore {
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .map_err(io_err!("unable to create namespace directory {}", dir.display()))?;
        debug!(path = %dir.display(), "namespace store opened");
        Ok(Self {
            inner: Arc::new(Inner {
                dir: dir.to_path_buf(),
                lock: Mutex::new(()),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.inner
            .lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Path of the record for `name`, which must stay inside the directory.
    fn record_path(&self, name: &str) -> StoreResult<PathBuf> {
        if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
            return Err(StoreError::InvalidName(format!("namespace {name:?}")));
        }
        Ok(self.inner.dir.join(format!("{name}{RECORD_SUFFIX}")))
    }

    fn read_record(&self, path: &Path) -> StoreResult<Option<NamespaceRecord>> {
        match fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| StoreError::Encoding {
                    file: path.display().to_string(),
                    source,
                }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                context: format!("unable to read namespace file {}", path.display()),
                source,
            }),
        }
    }

    fn write_record(&self, record: &NamespaceRecord) -> StoreResult<()> {
        let file_name = format!("{}{RECORD_SUFFIX}", record.name);
        let value = serde_json::to_vec_pretty(record).map_err(|source| StoreError::Encoding {
            file: file_name.clone(),
            source,
        })?;
        write_atomic(&self.inner.dir, &file_name, &value)
    }

    /// Persist a new namespace. `AlreadyExists` if the name is taken.
    pub fn create(&self, record: &NamespaceRecord) -> StoreResult<()> {
        let _guard = self.lock();
        if self.read_record(&self.record_path(&record.name)?)?.is_some() {
            return Err(StoreError::AlreadyExists(format!("namespace {}", record.name)));
        }
        self.write_record(record)?;
        debug!(namespace = %record.name, "namespace created");
        Ok(())
    }

    /// Create `record` unless a namespace of that name exists.
    /// Returns whether it was created.
    pub fn ensure(&self, record: &NamespaceRecord) -> StoreResult<bool> {
        let _guard = self.lock();
        if self.read_record(&self.record_path(&record.name)?)?.is_some() {
            return Ok(false);
        }
        self.write_record(record)?;
        debug!(namespace = %record.name, "namespace created");
        Ok(true)
    }

    pub fn get(&self, name: &str) -> StoreResult<NamespaceRecord> {
        let _guard = self.lock();
        self.read_record(&self.record_path(name)?)?
            .ok_or_else(|| StoreError::NotFound(format!("namespace {name}")))
    }

    pub fn exists(&self, name: &str) -> StoreResult<bool> {
        let _guard = self.lock();
        Ok(self.record_path(name)?.is_file())
    }

    /// All namespaces, sorted by name.
    pub fn list(&self) -> StoreResult<Vec<NamespaceRecord>> {
        let _guard = self.lock();
        let dir = &self.inner.dir;
        let read_dir = fs::read_dir(dir)
            .map_err(io_err!("unable to read namespace directory {}", dir.display()))?;

        let mut records = Vec::new();
        for entry in read_dir {
            let entry =
                entry.map_err(io_err!("unable to read namespace directory {}", dir.display()))?;
            let path = entry.path();
            let is_record = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.ends_with(RECORD_SUFFIX) && !n.starts_with('.'));
            if !is_record {
                continue;
            }
            if let Some(record) = self.read_record(&path)? {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    pub fn delete(&self, name: &str) -> StoreResult<()> {
        let _guard = self.lock();
        match fs::remove_file(self.record_path(name)?) {
            Ok(()) => {
                debug!(namespace = %name, "namespace deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(format!("namespace {name}")))
            }
            Err(source) => Err(StoreError::Io {
                context: format!("unable to remove namespace {name}"),
                source,
            }),
        }
    }
}

//! kubelite-store — filesystem-backed namespaced object store.
//!
//! Persists ConfigMaps and Secrets as flat files in one directory per
//! resource kind. There is no database and no in-memory cache: the derived
//! file name is the only index, and every operation rebuilds its view by
//! scanning the directory.
//!
//! # On-disk layout
//!
//! ```text
//! configmaps/
//!   default-app-config-k2dcm.metadata   ← label map (JSON)
//!   default-app-config-k2dcm-A          ← raw value of key "A"
//!   default-app-config-k2dcm-B          ← raw value of key "B"
//! ```
//!
//! A resource exists iff at least one data file carries its prefix.
//!
//! # Architecture
//!
//! ```text
//! FileSystemStore (one per kind, one lock per store)
//!   ├── naming     (namespace, name, key) ⇄ file name
//!   ├── metadata   label map ⇄ metadata file
//!   ├── index      one directory scan per operation
//!   └── binds      annotations → host bind-mount paths
//! ```

pub mod binds;
pub mod error;
mod fsutil;
pub mod index;
pub mod metadata;
pub mod namespaces;
pub mod naming;
pub mod store;
pub mod types;

pub use binds::extract_binds;
pub use error::{StoreError, StoreResult};
pub use namespaces::NamespaceStore;
pub use store::{FileSystemStore, StoreOptions};
pub use types::*;

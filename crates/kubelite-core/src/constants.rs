//! Well-known label, annotation and header names shared across kubelite crates.
//!
//! The `k2d.io` keys are part of the on-disk format and must not change.

/// Label injected into every stored metadata file, recording the owning namespace.
pub const NAMESPACE_NAME_LABEL_KEY: &str = "namespace.k2d.io/name";

/// Annotation prefix under which each data key's host file path is exposed.
pub const FILE_PATH_ANNOTATION_KEY: &str = "store.k2d.io/filesystem/path";

/// Reserved label carrying a Secret's `type`.
pub const SECRET_TYPE_LABEL_KEY: &str = "secret.k2d.io/type";

/// Namespace created at startup and never deletable.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Request header used to correlate a mutation across log lines.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

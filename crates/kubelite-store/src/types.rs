//! Domain types for the kubelite object store.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Resource kinds ─────────────────────────────────────────────────

/// The kind of resource served by one store instance.
///
/// Each kind owns a marker token from which its data-file separator and
/// metadata-file suffix are built. Names and keys must never contain the
/// marker, otherwise file names stop being reversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    ConfigMap,
    Secret,
}

impl ResourceKind {
    /// Reserved token that must not appear in names or keys.
    pub fn marker(&self) -> &'static str {
        match self {
            ResourceKind::ConfigMap => "k2dcm",
            ResourceKind::Secret => "k2dse",
        }
    }

    /// Token between `{namespace}-{name}` and the data key.
    pub fn separator(&self) -> &'static str {
        match self {
            ResourceKind::ConfigMap => "-k2dcm-",
            ResourceKind::Secret => "-k2dse-",
        }
    }

    /// Suffix appended to `{namespace}-{name}` for the metadata file.
    pub fn metadata_suffix(&self) -> &'static str {
        match self {
            ResourceKind::ConfigMap => "-k2dcm.metadata",
            ResourceKind::Secret => "-k2dse.metadata",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Secret => "Secret",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Resources ──────────────────────────────────────────────────────

/// A namespaced key/value resource (ConfigMap, Secret) as seen by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    pub namespace: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    /// Partially derived: bind-path annotations are synthesized on read.
    pub annotations: BTreeMap<String, String>,
    /// Opaque payload per key.
    pub data: BTreeMap<String, Vec<u8>>,
    /// Derived from data file modification times on read; ignored on write.
    pub creation_timestamp: Option<DateTime<Utc>>,
}

impl Resource {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_data(mut self, key: &str, value: impl Into<Vec<u8>>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    /// `{namespace}/{name}`, used in logs and error messages.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Resources of one kind, as returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceList {
    pub kind: ResourceKind,
    pub items: Vec<Resource>,
}

impl ResourceList {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ── Namespaces ─────────────────────────────────────────────────────

/// Persisted state of a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRecord {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub uid: String,
    pub creation_timestamp: DateTime<Utc>,
}

impl NamespaceRecord {
    pub fn new(name: &str, uid: &str) -> Self {
        Self {
            name: name.to_string(),
            labels: BTreeMap::new(),
            uid: uid.to_string(),
            creation_timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tokens_share_marker() {
        for kind in [ResourceKind::ConfigMap, ResourceKind::Secret] {
            assert!(kind.separator().contains(kind.marker()));
            assert!(kind.metadata_suffix().contains(kind.marker()));
            assert!(!kind.metadata_suffix().contains(kind.separator()));
        }
    }

    #[test]
    fn resource_builder() {
        let r = Resource::new("default", "app")
            .with_label("env", "prod")
            .with_data("A", "1");
        assert_eq!(r.qualified_name(), "default/app");
        assert_eq!(r.labels["env"], "prod");
        assert_eq!(r.data["A"], b"1");
    }

    #[test]
    fn namespace_record_json() {
        let record = NamespaceRecord::new("team-a", "uid-1");
        let json = serde_json::to_string(&record).unwrap();
        let parsed: NamespaceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}

//! Mutation operations and their ordering.

use std::cmp::Ordering;
use std::fmt;

use kubelite_store::{NamespaceRecord, Resource, ResourceKind};

/// How urgently an operation must be applied.
///
/// Namespaces are created before anything that lives in them, so their
/// creation is `High`; resource writes are `Medium`; teardown is `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        };
        f.write_str(s)
    }
}

/// What an operation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationPayload {
    CreateNamespace(NamespaceRecord),
    /// Remove the namespace and every ConfigMap and Secret in it.
    DeleteNamespace { name: String },
    StoreResource { kind: ResourceKind, resource: Resource },
    /// Queued removal of one ConfigMap or Secret, for callers that want it
    /// ordered behind pending writes. The REST API deletes synchronously and
    /// never submits it.
    DeleteResource {
        kind: ResourceKind,
        name: String,
        namespace: String,
    },
}

impl OperationPayload {
    /// Short description for logs, e.g. `store ConfigMap default/app`.
    pub fn describe(&self) -> String {
        match self {
            OperationPayload::CreateNamespace(record) => format!("create namespace {}", record.name),
            OperationPayload::DeleteNamespace { name } => format!("delete namespace {name}"),
            OperationPayload::StoreResource { kind, resource } => {
                format!("store {kind} {}", resource.qualified_name())
            }
            OperationPayload::DeleteResource {
                kind,
                name,
                namespace,
            } => format!("delete {kind} {namespace}/{name}"),
        }
    }
}

/// A queued mutation intent.
#[derive(Debug, Clone)]
pub struct Operation {
    pub payload: OperationPayload,
    pub priority: Priority,
    pub request_id: String,
    /// Submission order, used to keep FIFO order within a priority.
    pub sequence: u64,
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for Operation {}

impl PartialOrd for Operation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Max-heap order: higher priority first, then lower sequence first.
impl Ord for Operation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    fn op(priority: Priority, sequence: u64) -> Operation {
        Operation {
            payload: OperationPayload::DeleteNamespace {
                name: format!("ns-{sequence}"),
            },
            priority,
            request_id: format!("req-{sequence}"),
            sequence,
        }
    }

    #[test]
    fn heap_pops_by_priority_then_fifo() {
        let mut heap = BinaryHeap::new();
        heap.push(op(Priority::Low, 0));
        heap.push(op(Priority::Medium, 1));
        heap.push(op(Priority::High, 2));
        heap.push(op(Priority::Medium, 3));
        heap.push(op(Priority::High, 4));

        let order: Vec<_> = std::iter::from_fn(|| heap.pop())
            .map(|o| o.sequence)
            .collect();
        assert_eq!(order, vec![2, 4, 1, 3, 0]);
    }

    #[test]
    fn describe_payloads() {
        let payload = OperationPayload::StoreResource {
            kind: ResourceKind::ConfigMap,
            resource: Resource::new("default", "app"),
        };
        assert_eq!(payload.describe(), "store ConfigMap default/app");

        let payload = OperationPayload::DeleteResource {
            kind: ResourceKind::Secret,
            name: "db".into(),
            namespace: "prod".into(),
        };
        assert_eq!(payload.describe(), "delete Secret prod/db");
    }
}

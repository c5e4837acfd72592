//! StoreApplier — applies dispatched operations to the filesystem stores.

use tracing::{debug, warn};

use kubelite_store::{FileSystemStore, NamespaceStore, ResourceKind, StoreError};

use crate::dispatcher::OperationHandler;
use crate::error::DispatchResult;
use crate::operation::{Operation, OperationPayload};

#[derive(Clone)]
pub struct StoreApplier {
    configmaps: FileSystemStore,
    secrets: FileSystemStore,
    namespaces: NamespaceStore,
}

impl StoreApplier {
    pub fn new(
        configmaps: FileSystemStore,
        secrets: FileSystemStore,
        namespaces: NamespaceStore,
    ) -> Self {
        Self {
            configmaps,
            secrets,
            namespaces,
        }
    }

    fn store_for(&self, kind: ResourceKind) -> &FileSystemStore {
        match kind {
            ResourceKind::ConfigMap => &self.configmaps,
            ResourceKind::Secret => &self.secrets,
        }
    }

    /// Delete every ConfigMap and Secret of `namespace`, then the namespace.
    fn delete_namespace(&self, namespace: &str) -> DispatchResult<()> {
        for store in [&self.configmaps, &self.secrets] {
            let list = store.list(namespace)?;
            for resource in &list.items {
                match store.delete(&resource.name, namespace) {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(e.into()),
                }
            }
            debug!(namespace, kind = %store.kind(), removed = list.len(), "namespace contents removed");
        }
        self.namespaces.delete(namespace)?;
        Ok(())
    }
}

impl OperationHandler for StoreApplier {
    fn apply(&self, operation: &Operation) -> DispatchResult<()> {
        match &operation.payload {
            OperationPayload::CreateNamespace(record) => match self.namespaces.create(record) {
                Ok(()) => Ok(()),
                Err(StoreError::AlreadyExists(_)) => {
                    warn!(
                        request_id = %operation.request_id,
                        namespace = %record.name,
                        "namespace already exists, skipping create"
                    );
                    Ok(())
                }
                Err(e) => Err(e.into()),
            },
            OperationPayload::DeleteNamespace { name } => self.delete_namespace(name),
            OperationPayload::StoreResource { kind, resource } => {
                self.store_for(*kind).store(resource)?;
                Ok(())
            }
            OperationPayload::DeleteResource {
                kind,
                name,
                namespace,
            } => {
                self.store_for(*kind).delete(name, namespace)?;
                Ok(())
            }
        }
    }
}

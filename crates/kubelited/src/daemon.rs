//! Daemon assembly: open the stores, start the dispatcher, serve the API.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use kubelite_api::{ApiState, build_router};
use kubelite_core::KubeliteConfig;
use kubelite_core::constants::DEFAULT_NAMESPACE;
use kubelite_dispatch::{Dispatcher, StoreApplier};
use kubelite_store::{FileSystemStore, NamespaceRecord, NamespaceStore, ResourceKind, StoreOptions};

pub async fn run(config: KubeliteConfig) -> anyhow::Result<()> {
    info!(data_dir = %config.store.data_dir.display(), "kubelite daemon starting");

    // ── Stores ─────────────────────────────────────────────────

    let options = StoreOptions {
        prune_stale_keys: config.store.prune_stale_keys,
    };
    let configmaps = FileSystemStore::open(config.store.configmap_dir(), ResourceKind::ConfigMap, options)
        .context("unable to open ConfigMap store")?;
    let secrets = FileSystemStore::open(config.store.secret_dir(), ResourceKind::Secret, options)
        .context("unable to open Secret store")?;
    let namespaces =
        NamespaceStore::open(config.store.namespace_dir()).context("unable to open namespace store")?;
    info!(
        configmaps = %configmaps.path().display(),
        secrets = %secrets.path().display(),
        prune_stale_keys = options.prune_stale_keys,
        "stores opened"
    );

    let default_ns = NamespaceRecord::new(DEFAULT_NAMESPACE, &Uuid::new_v4().to_string());
    if namespaces.ensure(&default_ns)? {
        info!(namespace = DEFAULT_NAMESPACE, "namespace created");
    }

    // ── Dispatcher ─────────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (dispatcher, handle) = Dispatcher::new(config.dispatcher.queue_capacity);
    let applier = Arc::new(StoreApplier::new(
        configmaps.clone(),
        secrets.clone(),
        namespaces.clone(),
    ));
    let dispatcher_task = tokio::spawn(dispatcher.run(applier, shutdown_rx));

    // ── API server ─────────────────────────────────────────────

    let router = build_router(ApiState {
        configmaps,
        secrets,
        namespaces,
        dispatcher: handle,
    });
    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("unable to bind {addr}"))?;
    info!(%addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "unable to listen for shutdown signal");
            }
            info!("shutdown signal received");
        })
        .await?;

    // Pending mutations are applied before exit.
    let _ = shutdown_tx.send(true);
    if let Err(e) = dispatcher_task.await {
        warn!(error = %e, "dispatcher task failed");
    }

    info!("kubelite daemon stopped");
    Ok(())
}

//! Shelf application library
//!
//! Wires the library store into the module registry and HTTP server.

pub mod modules;

use std::sync::Arc;

use anyhow::Context;
use shelf_db::{LendingPolicy, LibraryStore, StoreOptions};
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Re-export commonly used types
pub use modules::*;

/// Store options derived from the `storage` and `lending` settings
pub fn store_options(settings: &Settings) -> StoreOptions {
    StoreOptions {
        data_file: settings.storage.data_file.clone(),
        atomic_writes: settings.storage.atomic_writes,
        seed_on_create: settings.storage.seed_on_create,
        policy: LendingPolicy {
            allow_reborrow: settings.lending.allow_reborrow,
            expiring_horizon_days: settings.lending.expiring_horizon_days,
        },
    }
}

/// The one store instance shared by every module in this process
pub fn open_store(settings: &Settings) -> Arc<LibraryStore> {
    Arc::new(LibraryStore::new(store_options(settings)))
}

/// Registry with the storage core module and the books module
pub fn build_registry(store: Arc<LibraryStore>) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, store);
    registry
}

/// Boot all modules, serve HTTP until interrupted, then shut modules down
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let store = open_store(&settings);
    let registry = build_registry(store);
    let ctx = InitCtx {
        settings: &settings,
    };

    registry
        .boot(&ctx)
        .await
        .context("failed to boot modules")?;

    let served = shelf_http::start_server(&registry, &settings, shutdown_signal()).await;

    registry
        .shutdown()
        .await
        .context("failed to stop modules")?;

    served
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

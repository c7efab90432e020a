use std::sync::Arc;

use async_trait::async_trait;
use shelf_db::LibraryStore;
use shelf_kernel::{InitCtx, Module};

/// Core module owning the catalog file: makes sure it exists before any
/// other module serves from it.
pub struct StorageModule {
    store: Arc<LibraryStore>,
}

impl StorageModule {
    pub fn new(store: Arc<LibraryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for StorageModule {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let store = Arc::clone(&self.store);
        let loaded = tokio::task::spawn_blocking(move || store.ensure_catalog()).await?;

        // A damaged catalog is served as empty rather than refusing to boot.
        match loaded {
            Ok(catalog) => tracing::info!(
                module = self.name(),
                path = %self.store.file().path().display(),
                books = catalog.books.len(),
                "catalog ready"
            ),
            Err(err) => tracing::warn!(
                module = self.name(),
                path = %self.store.file().path().display(),
                error = %err,
                "catalog unreadable; queries will see an empty catalog and writes will fail"
            ),
        }
        Ok(())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let store = Arc::clone(&self.store);
        let stats = tokio::task::spawn_blocking(move || store.statistics()).await?;
        tracing::info!(
            module = self.name(),
            total = stats.total_books,
            available = stats.available_books,
            borrowed = stats.borrowed_books,
            expiring = stats.expiring_books,
            "storage module started"
        );
        Ok(())
    }
}

/// Create a new instance of the storage module
pub fn create_module(store: Arc<LibraryStore>) -> Arc<dyn Module> {
    Arc::new(StorageModule::new(store))
}

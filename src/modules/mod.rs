pub mod books;
pub mod storage;

use std::sync::Arc;

use shelf_db::LibraryStore;
use shelf_kernel::ModuleRegistry;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, store: Arc<LibraryStore>) {
    registry.register_core(storage::create_module(Arc::clone(&store)));
    registry.register_custom(books::create_module(store));
}

pub mod catalog;
pub mod config;
pub mod origin;
pub mod recommend;
pub mod server;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogError};
pub use catalog::store::SnapshotStore;
pub use config::Config;
pub use recommend::Recommender;

use std::sync::Arc;
use std::time::Duration;

pub type AppState = Arc<CatalogState>;

pub struct CatalogState {
    pub catalog: Arc<dyn Catalog>,
    // Only set for the memory backend, feeds /healthz
    pub store: Option<Arc<SnapshotStore>>,
    pub recommender: Recommender,
    pub request_timeout: Duration,
}

impl CatalogState {
    pub fn new(catalog: Arc<dyn Catalog>, store: Option<Arc<SnapshotStore>>, request_timeout: Duration) -> Self {
        Self {
            recommender: Recommender::new(catalog.clone(), request_timeout),
            catalog,
            store,
            request_timeout,
        }
    }

    /// State serving straight from an in-memory store
    pub fn memory(store: Arc<SnapshotStore>, request_timeout: Duration) -> Self {
        Self::new(store.clone(), Some(store), request_timeout)
    }
}

impl std::fmt::Debug for CatalogState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogState")
            .field("catalog", &"<dyn Catalog>")
            .field("store", &self.store)
            .field("recommender", &self.recommender)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod testing;

pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

use std::sync::Arc;

use tracing::info;

use crate::config::{DatabaseConfig, StoreBackend};

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{Scope, Store};

/// Build the configured store. The PostgreSQL backend applies the bundled
/// schema before returning.
pub async fn connect_store(config: &DatabaseConfig) -> Result<Arc<dyn Store>, DatabaseError> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let pool = DatabaseManager::connect(config).await?;
            DatabaseManager::migrate(&pool).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

// Persistence collaborator: trait plus the backends the binary can select

pub mod file;
pub mod memory;
mod tables;
pub mod traits;

#[cfg(feature = "database")]
pub mod sqlite;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::{ConditionalWrite, Expected, Record, StoreError, WorkflowStore};

#[cfg(any(test, feature = "testing"))]
pub use traits::MockWorkflowStore;

#[cfg(feature = "database")]
pub use sqlite::SqliteStore;

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};

/// Builds the backend named in configuration
pub async fn open_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn WorkflowStore>> {
    let store: Arc<dyn WorkflowStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => Arc::new(FileStore::open(&config.path).await?),
        #[cfg(feature = "database")]
        StorageBackend::Sqlite => Arc::new(
            SqliteStore::new(&config.path, config.max_connections, config.auto_migrate).await?,
        ),
        #[cfg(not(feature = "database"))]
        StorageBackend::Sqlite => {
            anyhow::bail!("the sqlite backend requires building with the `database` feature")
        }
    };
    tracing::info!(backend = ?config.backend, path = %config.path, "Storage backend ready");
    Ok(store)
}

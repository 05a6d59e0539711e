//! Storage implementations.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::query::{MetadataQueryDao, Result};
use crate::traffic::{EndpointTraffic, InstanceTraffic, ServiceTraffic};

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryMetadataStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteMetadataStore;

/// Interface for traffic-record writes.
///
/// The aggregation side of every adapter: upserts apply merge-on-conflict
/// through the shared merge helpers, so liveness buckets only move forward
/// and a bare keep-alive never wipes reported properties.
#[async_trait]
pub trait TrafficStore: Send + Sync {
    async fn upsert_service(&self, traffic: ServiceTraffic) -> Result<()>;

    async fn upsert_instance(&self, traffic: InstanceTraffic) -> Result<()>;

    async fn upsert_endpoint(&self, traffic: EndpointTraffic) -> Result<()>;
}

/// Full adapter surface: reads plus the write seam.
pub trait MetadataStore: MetadataQueryDao + TrafficStore {}

impl<T: MetadataQueryDao + TrafficStore> MetadataStore for T {}

/// Storage type discriminator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Memory,
    Sqlite,
}

/// Storage configuration (discriminated union).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// SQLite-specific configuration.
    pub sqlite: SqliteConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Memory,
            sqlite: SqliteConfig::default(),
        }
    }
}

/// SQLite-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file path.
    pub path: String,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "data/metadata.db".to_string(),
        }
    }
}

/// Initialize storage based on configuration.
///
/// Returns the adapter selected by the storage type discriminator. Requires
/// the corresponding feature to be enabled for SQL backends.
pub async fn init_storage(config: &StorageConfig) -> Result<Arc<dyn MetadataStore>> {
    match config.storage_type {
        StorageType::Memory => {
            info!(storage_type = "memory", "Storage initialized");
            Ok(Arc::new(MemoryMetadataStore::new()))
        }
        StorageType::Sqlite => {
            #[cfg(feature = "sqlite")]
            {
                if let Some(parent) = std::path::Path::new(&config.sqlite.path).parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        crate::query::StorageError::Backend(format!(
                            "cannot create storage directory: {e}"
                        ))
                    })?;
                }

                let pool =
                    sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", config.sqlite.path))
                        .await?;

                let store = SqliteMetadataStore::new(pool);
                store.init().await?;

                info!(storage_type = "sqlite", path = %config.sqlite.path, "Storage initialized");
                Ok(Arc::new(store))
            }

            #[cfg(not(feature = "sqlite"))]
            {
                Err(crate::query::StorageError::Backend(
                    "SQLite support requires the 'sqlite' feature. Rebuild with --features sqlite"
                        .to_string(),
                ))
            }
        }
    }
}

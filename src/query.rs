//! Metadata query contract.
//!
//! `MetadataQueryDao` is the interface every storage adapter implements.
//! Multiple independent adapters must agree on its observable semantics
//! given equivalent stored data - filters, liveness windows, limits, and
//! null handling are all part of the contract, not adapter discretion.

use async_trait::async_trait;
use serde::Serialize;

use crate::layer::Layer;

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("backend error: {0}")]
    Backend(String),

    #[cfg(feature = "sqlite")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt {model} record {id}: {reason}")]
    CorruptRecord {
        model: &'static str,
        id: String,
        reason: String,
    },
}

/// Instrumentation language reported by an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Language {
    #[default]
    Unknown,
    Java,
    DotNet,
    NodeJs,
    Python,
    Ruby,
    Go,
    Lua,
    Php,
}

impl Language {
    /// Parse a reported language property value; unrecognized values map to
    /// `Unknown` rather than failing the record.
    pub fn from_value(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "java" => Language::Java,
            "dotnet" | ".net" => Language::DotNet,
            "nodejs" | "node.js" => Language::NodeJs,
            "python" => Language::Python,
            "ruby" => Language::Ruby,
            "go" | "golang" => Language::Go,
            "lua" => Language::Lua,
            "php" => Language::Php,
            _ => Language::Unknown,
        }
    }
}

/// A logical service, as served to the metadata API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub group: String,
    pub layers: Vec<String>,
    /// False for virtual services inferred from peer traffic.
    pub is_normal: bool,
}

/// Key/value attribute of a service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// A running instance of a service, as served to the metadata API.
///
/// `name` is always materialized, empty when nothing was recorded, so
/// consumers never branch on an absent field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInstance {
    pub id: String,
    pub name: String,
    pub instance_uuid: String,
    pub layer: Layer,
    pub language: Language,
    pub attributes: Vec<Attribute>,
}

/// An endpoint under a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub id: String,
    pub name: String,
}

/// Interface for metadata reads.
///
/// Implementations:
/// - `SqliteMetadataStore`: embedded SQL storage
/// - `MemoryMetadataStore`: in-memory storage
///
/// Corrupt rows are skipped and logged, never failing the batch; that skip
/// policy is uniform across adapters. Transient backend errors surface as
/// [`StorageError`] and are never retried here - retry is caller policy.
#[async_trait]
pub trait MetadataQueryDao: Send + Sync {
    /// List services, optionally filtered by layer and/or group.
    ///
    /// Filters are exact-match and conjunctive; an omitted filter means
    /// unconstrained, never an empty-string match.
    async fn list_services(&self, layer: Option<Layer>, group: Option<&str>)
        -> Result<Vec<Service>>;

    /// Rows whose service id equals `service_id`.
    ///
    /// List-shaped: the contract assumes uniqueness at the logical-entity
    /// level only, not at the adapter level.
    async fn get_services(&self, service_id: &str) -> Result<Vec<Service>>;

    /// Instances under `service_id` seen since `start_millis`.
    ///
    /// Liveness is one-sided: a row qualifies when its last ping bucket is
    /// at or after the minute bucket of `start_millis`. `end_millis` bounds
    /// the caller's display window only and does not filter storage.
    async fn list_instances(
        &self,
        start_millis: i64,
        end_millis: i64,
        service_id: &str,
    ) -> Result<Vec<ServiceInstance>>;

    /// First instance whose id equals `instance_id`, if any.
    async fn get_instance(&self, instance_id: &str) -> Result<Option<ServiceInstance>>;

    /// Endpoints under `service_id`, at most `limit` rows.
    ///
    /// A non-empty keyword restricts to names containing it as a
    /// case-sensitive substring. Truncation happens in the adapter's query,
    /// not client-side.
    async fn find_endpoints(
        &self,
        keyword: Option<&str>,
        service_id: &str,
        limit: usize,
    ) -> Result<Vec<Endpoint>>;
}

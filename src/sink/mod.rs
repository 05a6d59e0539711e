//! Event delivery to the aggregation pipeline.
//!
//! This module contains:
//! - `EventSink` trait: delivery seam between ingestion and aggregation
//! - Implementations: storage-backed sink, in-memory mock for testing

use async_trait::async_trait;

use crate::query::StorageError;
use crate::source::UpdateEvent;

pub mod mock;
pub mod storage;

pub use mock::MockEventSink;
pub use storage::StorageEventSink;

/// Result type for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;

/// Errors that can occur during event delivery.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("event delivery failed: {0}")]
    Delivery(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Interface for event delivery to the aggregation pipeline.
///
/// Delivery is fire-and-forget from the caller's perspective: the sink
/// serializes per entity key internally and the caller consumes nothing
/// beyond success/failure.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Accept one update event.
    async fn receive(&self, event: UpdateEvent) -> Result<()>;
}

//! Storage-backed event sink.
//!
//! Folds update events into traffic records and upserts them, closing the
//! keep-alive -> query loop when no external aggregation pipeline is wired
//! in. Per-entity serialization comes from the store's own upsert path.

use std::sync::Arc;

use async_trait::async_trait;

use crate::sink::{EventSink, Result, SinkError};
use crate::source::UpdateEvent;
use crate::storage::TrafficStore;
use crate::traffic::{InstanceTraffic, ServiceTraffic};

/// Sink that applies update events directly to a traffic store.
pub struct StorageEventSink {
    store: Arc<dyn TrafficStore>,
}

impl StorageEventSink {
    pub fn new(store: Arc<dyn TrafficStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventSink for StorageEventSink {
    async fn receive(&self, event: UpdateEvent) -> Result<()> {
        match event {
            UpdateEvent::InstanceUpdate(update) => {
                let traffic = InstanceTraffic::new(
                    &update.service_id,
                    &update.name,
                    update.layer,
                    update.properties,
                    update.time_bucket,
                )
                .map_err(|e| SinkError::Delivery(e.to_string()))?;
                self.store.upsert_instance(traffic).await?;
            }
            UpdateEvent::ServiceMeta(meta) => {
                let traffic =
                    ServiceTraffic::new(&meta.name, meta.layer, meta.is_normal, meta.time_bucket)
                        .map_err(|e| SinkError::Delivery(e.to_string()))?;
                self.store.upsert_service(traffic).await?;
            }
        }
        Ok(())
    }
}

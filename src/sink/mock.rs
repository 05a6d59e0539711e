//! Mock EventSink implementation for testing.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::sink::{EventSink, Result, SinkError};
use crate::source::UpdateEvent;

/// Mock sink that records received events in memory.
#[derive(Default)]
pub struct MockEventSink {
    received: RwLock<Vec<UpdateEvent>>,
    fail_on_receive: RwLock<bool>,
}

impl MockEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_receive(&self, fail: bool) {
        *self.fail_on_receive.write().await = fail;
    }

    /// Snapshot of everything received so far, in delivery order.
    pub async fn received(&self) -> Vec<UpdateEvent> {
        self.received.read().await.clone()
    }
}

#[async_trait]
impl EventSink for MockEventSink {
    async fn receive(&self, event: UpdateEvent) -> Result<()> {
        if *self.fail_on_receive.read().await {
            return Err(SinkError::Delivery("mock sink unavailable".to_string()));
        }
        self.received.write().await.push(event);
        Ok(())
    }
}

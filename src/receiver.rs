//! Management receiver: agent keep-alive ingestion.
//!
//! Consumes decoded management requests and routes them into the
//! aggregation pipeline as update events. Holds no state of its own, so one
//! receiver serves any number of concurrent request handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::identity::{self, IdentityError};
use crate::layer::Layer;
use crate::naming::NamingControl;
use crate::sink::{EventSink, SinkError};
use crate::source::{ServiceInstanceUpdate, ServiceMeta, UpdateEvent};
use crate::time_bucket::{time_bucket, Clock, DownSampling};

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors that can occur while ingesting a management request.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Caller's fault; not retried.
    #[error("invalid identity input: {0}")]
    Identity(#[from] IdentityError),

    /// Sink unavailable; the caller may retry the whole request.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Decoded keep-alive request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeepAliveRequest {
    pub service: String,
    pub service_instance: String,
}

/// Decoded instance properties report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstancePropertiesReport {
    pub service: String,
    pub service_instance: String,
    pub properties: BTreeMap<String, String>,
}

/// Routes management requests into update events.
pub struct ManagementReceiver {
    sink: Arc<dyn EventSink>,
    naming: Arc<dyn NamingControl>,
    clock: Arc<dyn Clock>,
}

impl ManagementReceiver {
    pub fn new(
        sink: Arc<dyn EventSink>,
        naming: Arc<dyn NamingControl>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { sink, naming, clock }
    }

    /// Ingest a keep-alive: one instance update, then one service update,
    /// both stamped with the same minute bucket.
    pub async fn on_keep_alive(&self, request: KeepAliveRequest) -> Result<()> {
        self.route(request.service, request.service_instance, BTreeMap::new())
            .await
    }

    /// Ingest a properties report: the same two events as a keep-alive, with
    /// the instance update carrying the reported property map.
    pub async fn report_instance_properties(
        &self,
        report: InstancePropertiesReport,
    ) -> Result<()> {
        self.route(report.service, report.service_instance, report.properties)
            .await
    }

    async fn route(
        &self,
        raw_service: String,
        raw_instance: String,
        properties: BTreeMap<String, String>,
    ) -> Result<()> {
        let service = self.naming.format_service_name(&raw_service);
        let instance = self.naming.format_instance_name(&raw_instance);

        // Reject bad input before the first emission; the two events go out
        // together or not at all.
        if instance.is_empty() {
            return Err(IdentityError::EmptyName.into());
        }
        let service_id = identity::service_id(&service, true)?;

        let bucket = time_bucket(self.clock.now_millis(), DownSampling::Minute);

        self.sink
            .receive(UpdateEvent::InstanceUpdate(ServiceInstanceUpdate {
                service_id,
                name: instance,
                properties,
                time_bucket: bucket,
                layer: Layer::General,
            }))
            .await?;

        self.sink
            .receive(UpdateEvent::ServiceMeta(ServiceMeta {
                name: service,
                is_normal: true,
                time_bucket: bucket,
                layer: Layer::General,
            }))
            .await?;

        Ok(())
    }
}

//! Metadata update events.
//!
//! One agent keep-alive fans out into two correlated events: an instance
//! liveness update and a service liveness update. Downstream aggregation
//! folds them into the persisted traffic records; this layer only shapes and
//! emits them.

use std::collections::BTreeMap;

use crate::layer::Layer;

/// Liveness/properties update for one service instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstanceUpdate {
    /// Id of the owning service.
    pub service_id: String,
    /// Agent-registered instance name.
    pub name: String,
    /// Reported instance attributes; empty on a bare keep-alive.
    pub properties: BTreeMap<String, String>,
    /// Minute bucket of the observation.
    pub time_bucket: i64,
    pub layer: Layer,
}

/// Liveness update for a logical service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceMeta {
    pub name: String,
    /// False for virtual services inferred from peer traffic.
    pub is_normal: bool,
    /// Minute bucket of the observation.
    pub time_bucket: i64,
    pub layer: Layer,
}

/// Update event routed to the aggregation pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    InstanceUpdate(ServiceInstanceUpdate),
    ServiceMeta(ServiceMeta),
}

impl UpdateEvent {
    /// Minute bucket the event was observed in.
    pub fn time_bucket(&self) -> i64 {
        match self {
            UpdateEvent::InstanceUpdate(update) => update.time_bucket,
            UpdateEvent::ServiceMeta(meta) => meta.time_bucket,
        }
    }
}

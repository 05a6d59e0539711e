//! Persisted traffic records and their shared builders.
//!
//! Traffic records are the storage-side shape of entities. The pure helpers
//! here - record construction, merge-on-write, and query-shape building -
//! are used by every adapter, so all backends decode and merge identically.

use std::collections::BTreeMap;

use crate::identity;
use crate::layer::Layer;
use crate::query::{Attribute, Endpoint, Language, Service, ServiceInstance};

/// Reserved instance property keys.
pub mod property {
    /// Decoded into the distinguished `language` field, never an attribute.
    pub const LANGUAGE: &str = "language";
    pub const HOST_NAME: &str = "hostname";
    pub const PROCESS_NO: &str = "process_no";
    pub const IPV4S: &str = "ipv4s";
    pub const OS_NAME: &str = "os_name";
}

/// Separator between group and short name in a service name.
const GROUP_SEPARATOR: &str = "::";

/// Persisted service row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTraffic {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub group: String,
    pub layer: Layer,
    pub is_normal: bool,
    /// Minute bucket of the most recent update.
    pub time_bucket: i64,
}

impl ServiceTraffic {
    /// Build a service row from an observed name.
    ///
    /// A name of the form `group::short` carries its grouping inline;
    /// anything else has an empty group and is its own short name.
    pub fn new(
        name: &str,
        layer: Layer,
        is_normal: bool,
        time_bucket: i64,
    ) -> identity::Result<Self> {
        let id = identity::service_id(name, is_normal)?;
        let (group, short_name) = match name.split_once(GROUP_SEPARATOR) {
            Some((group, short)) if !group.is_empty() && !short.is_empty() => (group, short),
            _ => ("", name),
        };
        Ok(Self {
            id,
            name: name.to_string(),
            short_name: short_name.to_string(),
            group: group.to_string(),
            layer,
            is_normal,
            time_bucket,
        })
    }
}

/// Persisted service instance row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceTraffic {
    pub id: String,
    pub service_id: String,
    /// Agent-registered name; empty when nothing was recorded.
    pub name: String,
    pub layer: Layer,
    pub properties: BTreeMap<String, String>,
    /// Minute bucket of the most recent heartbeat; never moves backward.
    pub last_ping_time_bucket: i64,
}

impl InstanceTraffic {
    /// Build an instance row from an agent-registered name.
    pub fn new(
        service_id: &str,
        registered_name: &str,
        layer: Layer,
        properties: BTreeMap<String, String>,
        last_ping_time_bucket: i64,
    ) -> identity::Result<Self> {
        let (token, display) = identity::split_instance_name(registered_name);
        let id = identity::instance_id(service_id, display, token)?;
        Ok(Self {
            id,
            service_id: service_id.to_string(),
            name: registered_name.to_string(),
            layer,
            properties,
            last_ping_time_bucket,
        })
    }
}

/// Persisted endpoint row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTraffic {
    pub id: String,
    pub service_id: String,
    pub name: String,
    pub time_bucket: i64,
}

impl EndpointTraffic {
    pub fn new(
        service_id: &str,
        name: &str,
        time_bucket: i64,
    ) -> identity::Result<Self> {
        let id = identity::endpoint_id(service_id, name)?;
        Ok(Self {
            id,
            service_id: service_id.to_string(),
            name: name.to_string(),
            time_bucket,
        })
    }
}

/// Merge an incoming service row into the stored one.
///
/// Last write wins per field; the update bucket never moves backward.
pub fn merge_service(existing: Option<ServiceTraffic>, incoming: ServiceTraffic) -> ServiceTraffic {
    match existing {
        Some(existing) => ServiceTraffic {
            time_bucket: existing.time_bucket.max(incoming.time_bucket),
            ..incoming
        },
        None => incoming,
    }
}

/// Merge an incoming instance row into the stored one.
///
/// The ping bucket never moves backward, and a bare keep-alive (empty
/// property map) leaves previously reported properties intact.
pub fn merge_instance(
    existing: Option<InstanceTraffic>,
    incoming: InstanceTraffic,
) -> InstanceTraffic {
    match existing {
        Some(existing) => {
            let mut merged = incoming;
            if merged.properties.is_empty() {
                merged.properties = existing.properties;
            }
            merged.last_ping_time_bucket = merged
                .last_ping_time_bucket
                .max(existing.last_ping_time_bucket);
            merged
        }
        None => incoming,
    }
}

/// Merge an incoming endpoint row into the stored one.
pub fn merge_endpoint(
    existing: Option<EndpointTraffic>,
    incoming: EndpointTraffic,
) -> EndpointTraffic {
    match existing {
        Some(existing) => EndpointTraffic {
            time_bucket: existing.time_bucket.max(incoming.time_bucket),
            ..incoming
        },
        None => incoming,
    }
}

/// Shape a stored service row for the metadata API.
pub fn build_service(traffic: &ServiceTraffic) -> Service {
    Service {
        id: traffic.id.clone(),
        name: traffic.name.clone(),
        short_name: traffic.short_name.clone(),
        group: traffic.group.clone(),
        layers: vec![traffic.layer.name().to_string()],
        is_normal: traffic.is_normal,
    }
}

/// Shape a stored instance row for the metadata API.
///
/// The reserved language property decodes into the `language` field; every
/// other property surfaces as an attribute. No recorded properties means
/// `Language::Unknown` and no attributes.
pub fn build_instance(traffic: &InstanceTraffic) -> ServiceInstance {
    let mut language = Language::Unknown;
    let mut attributes = Vec::new();
    for (key, value) in &traffic.properties {
        if key == property::LANGUAGE {
            language = Language::from_value(value);
        } else {
            attributes.push(Attribute {
                name: key.clone(),
                value: value.clone(),
            });
        }
    }
    ServiceInstance {
        id: traffic.id.clone(),
        name: traffic.name.clone(),
        instance_uuid: traffic.id.clone(),
        layer: traffic.layer,
        language,
        attributes,
    }
}

/// Shape a stored endpoint row for the metadata API.
pub fn build_endpoint(traffic: &EndpointTraffic) -> Endpoint {
    Endpoint {
        id: traffic.id.clone(),
        name: traffic.name.clone(),
    }
}

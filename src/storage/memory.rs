//! In-memory metadata storage.
//!
//! Backs tests and standalone deployments. Must stay observably
//! indistinguishable from the SQL adapters given equivalent stored data.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::layer::Layer;
use crate::query::{Endpoint, MetadataQueryDao, Result, Service, ServiceInstance};
use crate::storage::TrafficStore;
use crate::time_bucket::{time_bucket, DownSampling};
use crate::traffic::{
    build_endpoint, build_instance, build_service, merge_endpoint, merge_instance, merge_service,
    EndpointTraffic, InstanceTraffic, ServiceTraffic,
};

/// Metadata store keyed entirely in memory.
#[derive(Default)]
pub struct MemoryMetadataStore {
    services: RwLock<HashMap<String, ServiceTraffic>>,
    instances: RwLock<HashMap<String, InstanceTraffic>>,
    endpoints: RwLock<HashMap<String, EndpointTraffic>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrafficStore for MemoryMetadataStore {
    async fn upsert_service(&self, traffic: ServiceTraffic) -> Result<()> {
        let mut services = self.services.write().await;
        let existing = services.remove(&traffic.id);
        services.insert(traffic.id.clone(), merge_service(existing, traffic));
        Ok(())
    }

    async fn upsert_instance(&self, traffic: InstanceTraffic) -> Result<()> {
        let mut instances = self.instances.write().await;
        let existing = instances.remove(&traffic.id);
        instances.insert(traffic.id.clone(), merge_instance(existing, traffic));
        Ok(())
    }

    async fn upsert_endpoint(&self, traffic: EndpointTraffic) -> Result<()> {
        let mut endpoints = self.endpoints.write().await;
        let existing = endpoints.remove(&traffic.id);
        endpoints.insert(traffic.id.clone(), merge_endpoint(existing, traffic));
        Ok(())
    }
}

#[async_trait]
impl MetadataQueryDao for MemoryMetadataStore {
    async fn list_services(
        &self,
        layer: Option<Layer>,
        group: Option<&str>,
    ) -> Result<Vec<Service>> {
        let services = self.services.read().await;
        let mut rows: Vec<&ServiceTraffic> = services
            .values()
            .filter(|t| layer.map_or(true, |l| t.layer == l))
            .filter(|t| group.map_or(true, |g| t.group == g))
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(rows.into_iter().map(build_service).collect())
    }

    async fn get_services(&self, service_id: &str) -> Result<Vec<Service>> {
        let services = self.services.read().await;
        let mut rows: Vec<&ServiceTraffic> =
            services.values().filter(|t| t.id == service_id).collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(rows.into_iter().map(build_service).collect())
    }

    async fn list_instances(
        &self,
        start_millis: i64,
        _end_millis: i64,
        service_id: &str,
    ) -> Result<Vec<ServiceInstance>> {
        let minute_bucket = time_bucket(start_millis, DownSampling::Minute);
        let instances = self.instances.read().await;
        let mut rows: Vec<&InstanceTraffic> = instances
            .values()
            .filter(|t| t.service_id == service_id)
            .filter(|t| t.last_ping_time_bucket >= minute_bucket)
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rows.into_iter().map(build_instance).collect())
    }

    async fn get_instance(&self, instance_id: &str) -> Result<Option<ServiceInstance>> {
        let instances = self.instances.read().await;
        Ok(instances.get(instance_id).map(build_instance))
    }

    async fn find_endpoints(
        &self,
        keyword: Option<&str>,
        service_id: &str,
        limit: usize,
    ) -> Result<Vec<Endpoint>> {
        let endpoints = self.endpoints.read().await;
        let mut rows: Vec<&EndpointTraffic> = endpoints
            .values()
            .filter(|t| t.service_id == service_id)
            .filter(|t| match keyword {
                Some(keyword) if !keyword.is_empty() => t.name.contains(keyword),
                _ => true,
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        rows.truncate(limit);
        Ok(rows.into_iter().map(build_endpoint).collect())
    }
}

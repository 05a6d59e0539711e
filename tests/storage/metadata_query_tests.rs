//! Metadata query contract tests.
//!
//! These verify the observable semantics every adapter must reproduce:
//! filter composition, liveness windows, limits, and output normalization.
//! Records are seeded through the adapter's own write seam.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};

use telemeta::identity;
use telemeta::layer::Layer;
use telemeta::query::{Language, MetadataQueryDao};
use telemeta::storage::MetadataStore;
use telemeta::time_bucket::{time_bucket, DownSampling};
use telemeta::traffic::{property, EndpointTraffic, InstanceTraffic, ServiceTraffic};

/// 2021-02-03 04:05:06 UTC, the fixture "now".
pub fn now_millis() -> i64 {
    Utc.with_ymd_and_hms(2021, 2, 3, 4, 5, 6)
        .unwrap()
        .timestamp_millis()
}

pub fn service_id(name: &str) -> String {
    identity::service_id(name, true).expect("fixture service id")
}

pub fn instance_id(service: &str, registered_name: &str) -> String {
    let (token, name) = identity::split_instance_name(registered_name);
    identity::instance_id(&service_id(service), name, token).expect("fixture instance id")
}

fn service(name: &str, layer: Layer) -> ServiceTraffic {
    ServiceTraffic::new(name, layer, true, time_bucket(now_millis(), DownSampling::Minute))
        .expect("fixture service")
}

fn instance(
    service: &str,
    registered_name: &str,
    properties: BTreeMap<String, String>,
    last_ping_millis: i64,
) -> InstanceTraffic {
    InstanceTraffic::new(
        &service_id(service),
        registered_name,
        Layer::General,
        properties,
        time_bucket(last_ping_millis, DownSampling::Minute),
    )
    .expect("fixture instance")
}

fn endpoint(service: &str, name: &str) -> EndpointTraffic {
    EndpointTraffic::new(
        &service_id(service),
        name,
        time_bucket(now_millis(), DownSampling::Minute),
    )
    .expect("fixture endpoint")
}

// =============================================================================
// list_services
// =============================================================================

pub async fn test_list_services_unfiltered<S: MetadataStore>(store: &S) {
    store.upsert_service(service("shop", Layer::General)).await.unwrap();
    store.upsert_service(service("cart", Layer::General)).await.unwrap();
    store.upsert_service(service("infra::gateway", Layer::Mesh)).await.unwrap();

    let services = store.list_services(None, None).await.unwrap();
    assert_eq!(services.len(), 3, "no filter means no constraint");
}

pub async fn test_list_services_layer_filter<S: MetadataStore>(store: &S) {
    store.upsert_service(service("shop", Layer::General)).await.unwrap();
    store.upsert_service(service("infra::gateway", Layer::Mesh)).await.unwrap();

    let services = store.list_services(Some(Layer::Mesh), None).await.unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].name, "infra::gateway");
    assert_eq!(services[0].layers, vec!["MESH".to_string()]);
}

pub async fn test_list_services_group_filter<S: MetadataStore>(store: &S) {
    store.upsert_service(service("shop", Layer::General)).await.unwrap();
    store.upsert_service(service("infra::gateway", Layer::Mesh)).await.unwrap();
    store.upsert_service(service("infra::registry", Layer::General)).await.unwrap();

    let services = store.list_services(None, Some("infra")).await.unwrap();
    assert_eq!(services.len(), 2);
    assert!(services.iter().all(|s| s.group == "infra"));
}

pub async fn test_list_services_filters_are_conjunctive<S: MetadataStore>(store: &S) {
    store.upsert_service(service("infra::gateway", Layer::Mesh)).await.unwrap();
    store.upsert_service(service("infra::registry", Layer::General)).await.unwrap();

    let services = store
        .list_services(Some(Layer::Mesh), Some("infra"))
        .await
        .unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].name, "infra::gateway");

    let none = store
        .list_services(Some(Layer::Mesh), Some("retail"))
        .await
        .unwrap();
    assert!(none.is_empty());
}

pub async fn test_list_services_empty_group_is_not_a_wildcard<S: MetadataStore>(store: &S) {
    store.upsert_service(service("shop", Layer::General)).await.unwrap();
    store.upsert_service(service("infra::gateway", Layer::General)).await.unwrap();

    // An explicit empty group matches only ungrouped services; omission
    // matches everything.
    let ungrouped = store.list_services(None, Some("")).await.unwrap();
    assert_eq!(ungrouped.len(), 1);
    assert_eq!(ungrouped[0].name, "shop");

    let all = store.list_services(None, None).await.unwrap();
    assert_eq!(all.len(), 2);
}

// =============================================================================
// get_services
// =============================================================================

pub async fn test_get_services_by_id<S: MetadataStore>(store: &S) {
    store.upsert_service(service("shop", Layer::General)).await.unwrap();
    store.upsert_service(service("cart", Layer::General)).await.unwrap();

    let services = store.get_services(&service_id("shop")).await.unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].id, service_id("shop"));
    assert_eq!(services[0].name, "shop");
    assert!(services[0].is_normal);
}

pub async fn test_get_services_missing_id_is_empty<S: MetadataStore>(store: &S) {
    store.upsert_service(service("shop", Layer::General)).await.unwrap();

    let services = store.get_services(&service_id("ghost")).await.unwrap();
    assert!(services.is_empty());
}

pub async fn test_get_services_shapes_grouped_name<S: MetadataStore>(store: &S) {
    store.upsert_service(service("infra::gateway", Layer::Mesh)).await.unwrap();

    let services = store
        .get_services(&service_id("infra::gateway"))
        .await
        .unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].name, "infra::gateway");
    assert_eq!(services[0].short_name, "gateway");
    assert_eq!(services[0].group, "infra");
}

// =============================================================================
// list_instances
// =============================================================================

pub async fn test_list_instances_liveness_window<S: MetadataStore>(store: &S) {
    let now = now_millis();
    store
        .upsert_instance(instance("shop", "fresh-1", BTreeMap::new(), now))
        .await
        .unwrap();
    store
        .upsert_instance(instance(
            "shop",
            "stale-1",
            BTreeMap::new(),
            now - 10 * 60 * 1000,
        ))
        .await
        .unwrap();

    let instances = store
        .list_instances(now - 60 * 1000, now, &service_id("shop"))
        .await
        .unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].name, "fresh-1");
}

pub async fn test_list_instances_start_boundary_is_inclusive<S: MetadataStore>(store: &S) {
    let now = now_millis();
    store
        .upsert_instance(instance("shop", "edge-1", BTreeMap::new(), now))
        .await
        .unwrap();

    // Same minute bucket as the ping: still live
    let instances = store
        .list_instances(now, now, &service_id("shop"))
        .await
        .unwrap();
    assert_eq!(instances.len(), 1);
}

pub async fn test_list_instances_insensitive_to_end_timestamp<S: MetadataStore>(store: &S) {
    let now = now_millis();
    store
        .upsert_instance(instance("shop", "shop-1", BTreeMap::new(), now))
        .await
        .unwrap();
    store
        .upsert_instance(instance("shop", "shop-2", BTreeMap::new(), now))
        .await
        .unwrap();

    let start = now - 60 * 1000;
    let baseline = store
        .list_instances(start, now, &service_id("shop"))
        .await
        .unwrap();
    for end in [0, start, now - 10 * 60 * 1000, now + 3_600_000] {
        let varied = store
            .list_instances(start, end, &service_id("shop"))
            .await
            .unwrap();
        assert_eq!(varied, baseline, "end bound must not filter storage");
    }
}

pub async fn test_list_instances_scoped_to_service<S: MetadataStore>(store: &S) {
    let now = now_millis();
    store
        .upsert_instance(instance("shop", "shop-1", BTreeMap::new(), now))
        .await
        .unwrap();
    store
        .upsert_instance(instance("cart", "cart-1", BTreeMap::new(), now))
        .await
        .unwrap();

    let instances = store
        .list_instances(now - 1000, now, &service_id("shop"))
        .await
        .unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].name, "shop-1");
}

// =============================================================================
// get_instance
// =============================================================================

pub async fn test_get_instance_missing_is_none<S: MetadataStore>(store: &S) {
    let found = store
        .get_instance(&instance_id("shop", "ghost-1"))
        .await
        .unwrap();
    assert!(found.is_none());
}

pub async fn test_get_instance_by_id<S: MetadataStore>(store: &S) {
    let now = now_millis();
    store
        .upsert_instance(instance("shop", "uuid-1@host-a", BTreeMap::new(), now))
        .await
        .unwrap();

    let found = store
        .get_instance(&instance_id("shop", "uuid-1@host-a"))
        .await
        .unwrap()
        .expect("instance should exist");
    assert_eq!(found.name, "uuid-1@host-a");
    assert_eq!(found.instance_uuid, found.id);
}

pub async fn test_instance_absent_name_reads_as_empty_string<S: MetadataStore>(store: &S) {
    let now = now_millis();
    // A record persisted without a name: consumers still see a string
    let id = instance_id("shop", "anon-1");
    store
        .upsert_instance(InstanceTraffic {
            id: id.clone(),
            service_id: service_id("shop"),
            name: String::new(),
            layer: Layer::General,
            properties: BTreeMap::new(),
            last_ping_time_bucket: time_bucket(now, DownSampling::Minute),
        })
        .await
        .unwrap();

    let found = store.get_instance(&id).await.unwrap().expect("instance");
    assert_eq!(found.name, "");
}

pub async fn test_instance_without_properties_is_unknown_language<S: MetadataStore>(store: &S) {
    let now = now_millis();
    store
        .upsert_instance(instance("shop", "shop-1", BTreeMap::new(), now))
        .await
        .unwrap();

    let found = store
        .get_instance(&instance_id("shop", "shop-1"))
        .await
        .unwrap()
        .expect("instance");
    assert_eq!(found.language, Language::Unknown);
    assert!(found.attributes.is_empty());
}

pub async fn test_instance_properties_split_language_from_attributes<S: MetadataStore>(store: &S) {
    let now = now_millis();
    let mut properties = BTreeMap::new();
    properties.insert(property::LANGUAGE.to_string(), "java".to_string());
    properties.insert("host".to_string(), "h1".to_string());
    store
        .upsert_instance(instance("shop", "shop-1", properties, now))
        .await
        .unwrap();

    let found = store
        .get_instance(&instance_id("shop", "shop-1"))
        .await
        .unwrap()
        .expect("instance");
    assert_eq!(found.language, Language::Java);
    assert_eq!(found.attributes.len(), 1);
    assert_eq!(found.attributes[0].name, "host");
    assert_eq!(found.attributes[0].value, "h1");
}

// =============================================================================
// upsert merge semantics
// =============================================================================

pub async fn test_upsert_instance_ping_never_moves_backward<S: MetadataStore>(store: &S) {
    let now = now_millis();
    store
        .upsert_instance(instance("shop", "shop-1", BTreeMap::new(), now))
        .await
        .unwrap();
    // A delayed event from ten minutes ago arrives after the fresh one
    store
        .upsert_instance(instance(
            "shop",
            "shop-1",
            BTreeMap::new(),
            now - 10 * 60 * 1000,
        ))
        .await
        .unwrap();

    let instances = store
        .list_instances(now, now, &service_id("shop"))
        .await
        .unwrap();
    assert_eq!(instances.len(), 1, "ping bucket must not rewind");
}

pub async fn test_upsert_instance_keeps_properties_on_bare_keep_alive<S: MetadataStore>(store: &S) {
    let now = now_millis();
    let mut properties = BTreeMap::new();
    properties.insert(property::LANGUAGE.to_string(), "go".to_string());
    store
        .upsert_instance(instance("shop", "shop-1", properties, now))
        .await
        .unwrap();
    store
        .upsert_instance(instance("shop", "shop-1", BTreeMap::new(), now + 60 * 1000))
        .await
        .unwrap();

    let found = store
        .get_instance(&instance_id("shop", "shop-1"))
        .await
        .unwrap()
        .expect("instance");
    assert_eq!(found.language, Language::Go);
}

pub async fn test_upsert_instance_is_idempotent<S: MetadataStore>(store: &S) {
    let now = now_millis();
    for _ in 0..3 {
        store
            .upsert_instance(instance("shop", "shop-1", BTreeMap::new(), now))
            .await
            .unwrap();
    }

    let instances = store
        .list_instances(now - 1000, now, &service_id("shop"))
        .await
        .unwrap();
    assert_eq!(instances.len(), 1);
}

// =============================================================================
// find_endpoints
// =============================================================================

pub async fn test_find_endpoints_keyword_and_limit<S: MetadataStore>(store: &S) {
    for name in ["/api/orders", "/api/users", "/api/carts", "/health", "/metrics"] {
        store.upsert_endpoint(endpoint("shop", name)).await.unwrap();
    }

    let endpoints = store
        .find_endpoints(Some("/api"), &service_id("shop"), 2)
        .await
        .unwrap();
    assert_eq!(endpoints.len(), 2, "limit truncates in the adapter");
    assert!(endpoints.iter().all(|e| e.name.contains("/api")));
}

pub async fn test_find_endpoints_keyword_is_case_sensitive<S: MetadataStore>(store: &S) {
    store.upsert_endpoint(endpoint("shop", "/api/orders")).await.unwrap();
    store.upsert_endpoint(endpoint("shop", "/API/admin")).await.unwrap();

    let endpoints = store
        .find_endpoints(Some("/API"), &service_id("shop"), 10)
        .await
        .unwrap();
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].name, "/API/admin");
}

pub async fn test_find_endpoints_without_keyword<S: MetadataStore>(store: &S) {
    for name in ["/api/orders", "/health"] {
        store.upsert_endpoint(endpoint("shop", name)).await.unwrap();
    }

    let endpoints = store
        .find_endpoints(None, &service_id("shop"), 10)
        .await
        .unwrap();
    assert_eq!(endpoints.len(), 2);

    // Empty keyword behaves like no keyword, not like an empty-string match
    let endpoints = store
        .find_endpoints(Some(""), &service_id("shop"), 10)
        .await
        .unwrap();
    assert_eq!(endpoints.len(), 2);
}

pub async fn test_find_endpoints_scoped_to_service<S: MetadataStore>(store: &S) {
    store.upsert_endpoint(endpoint("shop", "/api/orders")).await.unwrap();
    store.upsert_endpoint(endpoint("cart", "/api/items")).await.unwrap();

    let endpoints = store
        .find_endpoints(None, &service_id("cart"), 10)
        .await
        .unwrap();
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].name, "/api/items");
}

//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Service traffic table schema.
#[derive(Iden)]
pub enum Services {
    #[iden = "service_traffic"]
    Table,
    #[iden = "id"]
    Id,
    #[iden = "name"]
    Name,
    #[iden = "short_name"]
    ShortName,
    #[iden = "service_group"]
    ServiceGroup,
    #[iden = "layer"]
    Layer,
    #[iden = "is_normal"]
    IsNormal,
    #[iden = "time_bucket"]
    TimeBucket,
}

/// Instance traffic table schema.
#[derive(Iden)]
pub enum Instances {
    #[iden = "instance_traffic"]
    Table,
    #[iden = "id"]
    Id,
    #[iden = "service_id"]
    ServiceId,
    #[iden = "name"]
    Name,
    #[iden = "layer"]
    Layer,
    #[iden = "properties"]
    Properties,
    #[iden = "last_ping_time_bucket"]
    LastPingTimeBucket,
}

/// Endpoint traffic table schema.
#[derive(Iden)]
pub enum Endpoints {
    #[iden = "endpoint_traffic"]
    Table,
    #[iden = "id"]
    Id,
    #[iden = "service_id"]
    ServiceId,
    #[iden = "name"]
    Name,
    #[iden = "time_bucket"]
    TimeBucket,
}

/// SQL for creating the service traffic table.
pub const CREATE_SERVICES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS service_traffic (
    id TEXT NOT NULL PRIMARY KEY,
    name TEXT NOT NULL,
    short_name TEXT NOT NULL,
    service_group TEXT NOT NULL,
    layer INTEGER NOT NULL,
    is_normal INTEGER NOT NULL DEFAULT 1,
    time_bucket INTEGER NOT NULL
)
"#;

/// SQL for indexing services by layer and group.
pub const CREATE_SERVICES_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_service_traffic_layer_group
    ON service_traffic(layer, service_group)
"#;

/// SQL for creating the instance traffic table.
pub const CREATE_INSTANCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS instance_traffic (
    id TEXT NOT NULL PRIMARY KEY,
    service_id TEXT NOT NULL,
    name TEXT,
    layer INTEGER NOT NULL,
    properties TEXT,
    last_ping_time_bucket INTEGER NOT NULL
)
"#;

/// SQL for indexing instances by owning service and liveness bucket.
pub const CREATE_INSTANCES_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_instance_traffic_service_ping
    ON instance_traffic(service_id, last_ping_time_bucket)
"#;

/// SQL for creating the endpoint traffic table.
pub const CREATE_ENDPOINTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS endpoint_traffic (
    id TEXT NOT NULL PRIMARY KEY,
    service_id TEXT NOT NULL,
    name TEXT NOT NULL,
    time_bucket INTEGER NOT NULL
)
"#;

/// SQL for indexing endpoints by owning service.
pub const CREATE_ENDPOINTS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_endpoint_traffic_service
    ON endpoint_traffic(service_id)
"#;

//! SQLite implementation of the metadata storage interfaces.
//!
//! The exemplar SQL adapter. Query translation follows one pattern: a base
//! scan over the model's table, a conjunctive predicate per supplied index
//! filter, the keyword predicate where the contract allows one, then
//! ordering and limit, with rows decoded through the shared traffic
//! builders. Any other SQL backend should reproduce this translation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Acquire, Row, SqlitePool};
use tracing::warn;

use crate::layer::Layer;
use crate::query::{
    Endpoint, MetadataQueryDao, Result, Service, ServiceInstance, StorageError,
};
use crate::storage::TrafficStore;
use crate::time_bucket::{time_bucket, DownSampling};
use crate::traffic::{
    build_endpoint, build_instance, build_service, merge_endpoint, merge_instance, merge_service,
    EndpointTraffic, InstanceTraffic, ServiceTraffic,
};

use super::schema::{
    Endpoints, Instances, Services, CREATE_ENDPOINTS_INDEX, CREATE_ENDPOINTS_TABLE,
    CREATE_INSTANCES_INDEX, CREATE_INSTANCES_TABLE, CREATE_SERVICES_INDEX, CREATE_SERVICES_TABLE,
};

const SERVICE_MODEL: &str = "service_traffic";
const INSTANCE_MODEL: &str = "instance_traffic";
const ENDPOINT_MODEL: &str = "endpoint_traffic";

/// SQLite-backed metadata store.
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    /// Create a new SQLite metadata store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        for statement in [
            CREATE_SERVICES_TABLE,
            CREATE_SERVICES_INDEX,
            CREATE_INSTANCES_TABLE,
            CREATE_INSTANCES_INDEX,
            CREATE_ENDPOINTS_TABLE,
            CREATE_ENDPOINTS_INDEX,
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataQueryDao for SqliteMetadataStore {
    async fn list_services(
        &self,
        layer: Option<Layer>,
        group: Option<&str>,
    ) -> Result<Vec<Service>> {
        let sql = {
            let mut query = Query::select();
            query
                .columns([
                    Services::Id,
                    Services::Name,
                    Services::ShortName,
                    Services::ServiceGroup,
                    Services::Layer,
                    Services::IsNormal,
                    Services::TimeBucket,
                ])
                .from(Services::Table);
            if let Some(layer) = layer {
                query.and_where(Expr::col(Services::Layer).eq(layer.value()));
            }
            if let Some(group) = group {
                query.and_where(Expr::col(Services::ServiceGroup).eq(group));
            }
            query
                .order_by(Services::Name, Order::Asc)
                .order_by(Services::Id, Order::Asc);
            query.to_string(SqliteQueryBuilder)
        };

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(decode_rows(&rows, SERVICE_MODEL, decode_service)
            .iter()
            .map(build_service)
            .collect())
    }

    async fn get_services(&self, service_id: &str) -> Result<Vec<Service>> {
        let query = Query::select()
            .columns([
                Services::Id,
                Services::Name,
                Services::ShortName,
                Services::ServiceGroup,
                Services::Layer,
                Services::IsNormal,
                Services::TimeBucket,
            ])
            .from(Services::Table)
            .and_where(Expr::col(Services::Id).eq(service_id))
            .order_by(Services::Name, Order::Asc)
            .order_by(Services::Id, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        Ok(decode_rows(&rows, SERVICE_MODEL, decode_service)
            .iter()
            .map(build_service)
            .collect())
    }

    async fn list_instances(
        &self,
        start_millis: i64,
        _end_millis: i64,
        service_id: &str,
    ) -> Result<Vec<ServiceInstance>> {
        let minute_bucket = time_bucket(start_millis, DownSampling::Minute);
        let query = Query::select()
            .columns([
                Instances::Id,
                Instances::ServiceId,
                Instances::Name,
                Instances::Layer,
                Instances::Properties,
                Instances::LastPingTimeBucket,
            ])
            .from(Instances::Table)
            .and_where(Expr::col(Instances::ServiceId).eq(service_id))
            .and_where(Expr::col(Instances::LastPingTimeBucket).gte(minute_bucket))
            .order_by(Instances::Id, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        Ok(decode_rows(&rows, INSTANCE_MODEL, decode_instance)
            .iter()
            .map(build_instance)
            .collect())
    }

    async fn get_instance(&self, instance_id: &str) -> Result<Option<ServiceInstance>> {
        let query = Query::select()
            .columns([
                Instances::Id,
                Instances::ServiceId,
                Instances::Name,
                Instances::Layer,
                Instances::Properties,
                Instances::LastPingTimeBucket,
            ])
            .from(Instances::Table)
            .and_where(Expr::col(Instances::Id).eq(instance_id))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        Ok(decode_rows(&rows, INSTANCE_MODEL, decode_instance)
            .first()
            .map(build_instance))
    }

    async fn find_endpoints(
        &self,
        keyword: Option<&str>,
        service_id: &str,
        limit: usize,
    ) -> Result<Vec<Endpoint>> {
        let sql = {
            let mut query = Query::select();
            query
                .columns([
                    Endpoints::Id,
                    Endpoints::ServiceId,
                    Endpoints::Name,
                    Endpoints::TimeBucket,
                ])
                .from(Endpoints::Table)
                .and_where(Expr::col(Endpoints::ServiceId).eq(service_id));
            if let Some(keyword) = keyword {
                if !keyword.is_empty() {
                    // LIKE folds ASCII case; instr keeps the match case-sensitive
                    query.and_where(Expr::cust_with_values("instr(name, ?) > 0", [keyword]));
                }
            }
            query
                .order_by(Endpoints::Name, Order::Asc)
                .order_by(Endpoints::Id, Order::Asc)
                .limit(limit as u64);
            query.to_string(SqliteQueryBuilder)
        };

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(decode_rows(&rows, ENDPOINT_MODEL, decode_endpoint)
            .iter()
            .map(build_endpoint)
            .collect())
    }
}

#[async_trait]
impl TrafficStore for SqliteMetadataStore {
    async fn upsert_service(&self, traffic: ServiceTraffic) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let select = Query::select()
            .columns([
                Services::Id,
                Services::Name,
                Services::ShortName,
                Services::ServiceGroup,
                Services::Layer,
                Services::IsNormal,
                Services::TimeBucket,
            ])
            .from(Services::Table)
            .and_where(Expr::col(Services::Id).eq(&traffic.id))
            .to_string(SqliteQueryBuilder);
        let existing = sqlx::query(&select)
            .fetch_optional(&mut *tx)
            .await?
            .and_then(|row| decode_existing(&row, SERVICE_MODEL, decode_service));

        let merged = merge_service(existing, traffic);
        let is_normal = if merged.is_normal { 1i32 } else { 0i32 };
        let insert = Query::insert()
            .into_table(Services::Table)
            .columns([
                Services::Id,
                Services::Name,
                Services::ShortName,
                Services::ServiceGroup,
                Services::Layer,
                Services::IsNormal,
                Services::TimeBucket,
            ])
            .values_panic([
                merged.id.into(),
                merged.name.into(),
                merged.short_name.into(),
                merged.group.into(),
                merged.layer.value().into(),
                is_normal.into(),
                merged.time_bucket.into(),
            ])
            .on_conflict(
                OnConflict::column(Services::Id)
                    .update_columns([
                        Services::Name,
                        Services::ShortName,
                        Services::ServiceGroup,
                        Services::Layer,
                        Services::IsNormal,
                        Services::TimeBucket,
                    ])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);
        sqlx::query(&insert).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn upsert_instance(&self, traffic: InstanceTraffic) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let select = Query::select()
            .columns([
                Instances::Id,
                Instances::ServiceId,
                Instances::Name,
                Instances::Layer,
                Instances::Properties,
                Instances::LastPingTimeBucket,
            ])
            .from(Instances::Table)
            .and_where(Expr::col(Instances::Id).eq(&traffic.id))
            .to_string(SqliteQueryBuilder);
        let existing = sqlx::query(&select)
            .fetch_optional(&mut *tx)
            .await?
            .and_then(|row| decode_existing(&row, INSTANCE_MODEL, decode_instance));

        let merged = merge_instance(existing, traffic);
        let name: Option<String> = if merged.name.is_empty() {
            None
        } else {
            Some(merged.name)
        };
        let properties = encode_properties(&merged.properties)?;
        let insert = Query::insert()
            .into_table(Instances::Table)
            .columns([
                Instances::Id,
                Instances::ServiceId,
                Instances::Name,
                Instances::Layer,
                Instances::Properties,
                Instances::LastPingTimeBucket,
            ])
            .values_panic([
                merged.id.into(),
                merged.service_id.into(),
                name.into(),
                merged.layer.value().into(),
                properties.into(),
                merged.last_ping_time_bucket.into(),
            ])
            .on_conflict(
                OnConflict::column(Instances::Id)
                    .update_columns([
                        Instances::ServiceId,
                        Instances::Name,
                        Instances::Layer,
                        Instances::Properties,
                        Instances::LastPingTimeBucket,
                    ])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);
        sqlx::query(&insert).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn upsert_endpoint(&self, traffic: EndpointTraffic) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let select = Query::select()
            .columns([
                Endpoints::Id,
                Endpoints::ServiceId,
                Endpoints::Name,
                Endpoints::TimeBucket,
            ])
            .from(Endpoints::Table)
            .and_where(Expr::col(Endpoints::Id).eq(&traffic.id))
            .to_string(SqliteQueryBuilder);
        let existing = sqlx::query(&select)
            .fetch_optional(&mut *tx)
            .await?
            .and_then(|row| decode_existing(&row, ENDPOINT_MODEL, decode_endpoint));

        let merged = merge_endpoint(existing, traffic);
        let insert = Query::insert()
            .into_table(Endpoints::Table)
            .columns([
                Endpoints::Id,
                Endpoints::ServiceId,
                Endpoints::Name,
                Endpoints::TimeBucket,
            ])
            .values_panic([
                merged.id.into(),
                merged.service_id.into(),
                merged.name.into(),
                merged.time_bucket.into(),
            ])
            .on_conflict(
                OnConflict::column(Endpoints::Id)
                    .update_columns([
                        Endpoints::ServiceId,
                        Endpoints::Name,
                        Endpoints::TimeBucket,
                    ])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);
        sqlx::query(&insert).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Decode rows, skipping and logging corrupt ones.
///
/// One bad row must not poison an otherwise-successful query.
fn decode_rows<T>(
    rows: &[SqliteRow],
    model: &'static str,
    decode: impl Fn(&SqliteRow) -> Result<T>,
) -> Vec<T> {
    let mut decoded = Vec::with_capacity(rows.len());
    for row in rows {
        match decode(row) {
            Ok(record) => decoded.push(record),
            Err(error) => warn!(model, %error, "Skipping corrupt record"),
        }
    }
    decoded
}

/// Decode a row fetched ahead of a merge; a corrupt stored row is logged and
/// treated as absent so the incoming record replaces it.
fn decode_existing<T>(
    row: &SqliteRow,
    model: &'static str,
    decode: impl Fn(&SqliteRow) -> Result<T>,
) -> Option<T> {
    match decode(row) {
        Ok(record) => Some(record),
        Err(error) => {
            warn!(model, %error, "Replacing corrupt record");
            None
        }
    }
}

fn corrupt(model: &'static str, id: &str, reason: impl ToString) -> StorageError {
    StorageError::CorruptRecord {
        model,
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

fn decode_service(row: &SqliteRow) -> Result<ServiceTraffic> {
    let id: String = row
        .try_get("id")
        .map_err(|e| corrupt(SERVICE_MODEL, "", e))?;
    Ok(ServiceTraffic {
        name: row
            .try_get("name")
            .map_err(|e| corrupt(SERVICE_MODEL, &id, e))?,
        short_name: row
            .try_get("short_name")
            .map_err(|e| corrupt(SERVICE_MODEL, &id, e))?,
        group: row
            .try_get("service_group")
            .map_err(|e| corrupt(SERVICE_MODEL, &id, e))?,
        layer: Layer::from_value(
            row.try_get::<i64, _>("layer")
                .map_err(|e| corrupt(SERVICE_MODEL, &id, e))? as i32,
        ),
        is_normal: row
            .try_get::<i64, _>("is_normal")
            .map_err(|e| corrupt(SERVICE_MODEL, &id, e))?
            != 0,
        time_bucket: row
            .try_get("time_bucket")
            .map_err(|e| corrupt(SERVICE_MODEL, &id, e))?,
        id,
    })
}

fn decode_instance(row: &SqliteRow) -> Result<InstanceTraffic> {
    let id: String = row
        .try_get("id")
        .map_err(|e| corrupt(INSTANCE_MODEL, "", e))?;
    Ok(InstanceTraffic {
        service_id: row
            .try_get("service_id")
            .map_err(|e| corrupt(INSTANCE_MODEL, &id, e))?,
        name: row
            .try_get::<Option<String>, _>("name")
            .map_err(|e| corrupt(INSTANCE_MODEL, &id, e))?
            .unwrap_or_default(),
        layer: Layer::from_value(
            row.try_get::<i64, _>("layer")
                .map_err(|e| corrupt(INSTANCE_MODEL, &id, e))? as i32,
        ),
        properties: decode_properties(
            row.try_get::<Option<String>, _>("properties")
                .map_err(|e| corrupt(INSTANCE_MODEL, &id, e))?,
            &id,
        )?,
        last_ping_time_bucket: row
            .try_get("last_ping_time_bucket")
            .map_err(|e| corrupt(INSTANCE_MODEL, &id, e))?,
        id,
    })
}

fn decode_endpoint(row: &SqliteRow) -> Result<EndpointTraffic> {
    let id: String = row
        .try_get("id")
        .map_err(|e| corrupt(ENDPOINT_MODEL, "", e))?;
    Ok(EndpointTraffic {
        service_id: row
            .try_get("service_id")
            .map_err(|e| corrupt(ENDPOINT_MODEL, &id, e))?,
        name: row
            .try_get("name")
            .map_err(|e| corrupt(ENDPOINT_MODEL, &id, e))?,
        time_bucket: row
            .try_get("time_bucket")
            .map_err(|e| corrupt(ENDPOINT_MODEL, &id, e))?,
        id,
    })
}

fn decode_properties(
    column: Option<String>,
    id: &str,
) -> Result<BTreeMap<String, String>> {
    match column {
        Some(json) if !json.is_empty() => serde_json::from_str(&json)
            .map_err(|e| corrupt(INSTANCE_MODEL, id, e)),
        _ => Ok(BTreeMap::new()),
    }
}

fn encode_properties(properties: &BTreeMap<String, String>) -> Result<Option<String>> {
    if properties.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(properties)
        .map(Some)
        .map_err(|e| StorageError::Backend(format!("cannot encode properties: {e}")))
}

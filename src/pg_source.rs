//! Postgres-backed [`PrimarySource`] and [`LookupSource`] implementations.
//!
//! Rows are decoded positionally into JSON cells. Only the column types
//! the entity queries produce are accepted; anything else is reported
//! as an error naming the column, which fails the batch.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Row, TypeInfo, ValueRef};
use uuid::Uuid;

use profile_harvest_core::entity::EntitySpec;
use profile_harvest_core::models::{RawRow, UserId};
use profile_harvest_core::source::{LookupSource, PrimarySource};

/// The profile database.
pub struct PgPrimary {
    pool: PgPool,
}

impl PgPrimary {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrimarySource for PgPrimary {
    async fn fetch_rows(&self, entity: &EntitySpec, user_ids: &[UserId]) -> Result<Vec<RawRow>> {
        let query = sqlx::query(entity.query);
        let query = match IdList::from_ids(user_ids)? {
            IdList::Int(ids) => query.bind(ids),
            IdList::Uuid(ids) => query.bind(ids),
        };
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_cells).collect()
    }
}

/// The reference database.
pub struct PgLookup {
    pool: PgPool,
}

impl PgLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LookupSource for PgLookup {
    async fn fetch_pairs(
        &self,
        table: &str,
        key_column: &str,
        label_column: &str,
    ) -> Result<Vec<(Value, Value)>> {
        let sql = format!(
            r#"SELECT "{}", "{}" FROM "{}" WHERE date_deleted IS NULL"#,
            key_column, label_column, table
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| Ok((cell_at(row, 0)?, cell_at(row, 1)?)))
            .collect()
    }
}

/// A batch of identifiers in the shape Postgres can bind as one array.
enum IdList {
    Int(Vec<i64>),
    Uuid(Vec<Uuid>),
}

impl IdList {
    fn from_ids(ids: &[UserId]) -> Result<Self> {
        match ids.first() {
            Some(UserId::Uuid(_)) => ids
                .iter()
                .map(|id| match id {
                    UserId::Uuid(u) => Ok(*u),
                    UserId::Int(i) => bail!("mixed identifier kinds in batch: {}", i),
                })
                .collect::<Result<Vec<_>>>()
                .map(IdList::Uuid),
            _ => ids
                .iter()
                .map(|id| match id {
                    UserId::Int(i) => Ok(*i),
                    UserId::Uuid(u) => bail!("mixed identifier kinds in batch: {}", u),
                })
                .collect::<Result<Vec<_>>>()
                .map(IdList::Int),
        }
    }
}

fn row_to_cells(row: &PgRow) -> Result<RawRow> {
    (0..row.len()).map(|idx| cell_at(row, idx)).collect()
}

/// Decode one column of a row into a JSON cell.
pub(crate) fn cell_at(row: &PgRow, idx: usize) -> Result<Value> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let cell = match type_name.as_str() {
        "BOOL" => Value::Bool(row.try_get::<bool, _>(idx)?),
        "INT2" => Value::from(row.try_get::<i16, _>(idx)?),
        "INT4" => Value::from(row.try_get::<i32, _>(idx)?),
        "INT8" => Value::from(row.try_get::<i64, _>(idx)?),
        "FLOAT4" => Value::from(f64::from(row.try_get::<f32, _>(idx)?)),
        "FLOAT8" => Value::from(row.try_get::<f64, _>(idx)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => Value::String(row.try_get::<String, _>(idx)?),
        "UUID" => Value::String(row.try_get::<Uuid, _>(idx)?.to_string()),
        "JSON" | "JSONB" => row.try_get::<Value, _>(idx)?,
        other => bail!(
            "column '{}' has unsupported type {}",
            row.column(idx).name(),
            other
        ),
    };
    Ok(cell)
}

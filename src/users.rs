//! User identifier discovery.
//!
//! The run's user set comes from one of two places:
//!
//! - a CSV file whose named column lists user UUIDs, which are resolved
//!   to the learning account ids every entity table is keyed by, or
//! - when no file is configured, the first `default_user_limit`
//!   non-deleted learning accounts.
//!
//! The resulting list is fixed for the rest of the run.

use anyhow::{bail, Context, Result};
use sqlx::PgPool;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

use profile_harvest_core::models::UserId;

use crate::config::Config;
use crate::pg_source::cell_at;

/// Read user UUIDs from one column of a CSV file with a header row.
///
/// Blank cells are skipped. A cell that is not a UUID is an error
/// naming its line.
pub fn read_user_uuids(path: &Path, column: &str) -> Result<Vec<Uuid>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open user file: {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let Some(idx) = headers.iter().position(|h| h.trim() == column) else {
        bail!(
            "Column '{}' not found in {} (columns: {})",
            column,
            path.display(),
            headers.iter().collect::<Vec<_>>().join(", ")
        );
    };

    let mut uuids = Vec::new();
    for (n, record) in reader.records().enumerate() {
        let record = record?;
        let cell = record.get(idx).unwrap_or("").trim();
        if cell.is_empty() {
            continue;
        }
        let uuid = Uuid::parse_str(cell)
            .with_context(|| format!("{}:{}: '{}' is not a UUID", path.display(), n + 2, cell))?;
        uuids.push(uuid);
    }
    Ok(uuids)
}

/// Resolve the run's user identifiers.
///
/// `input` overrides the configured CSV path when given.
pub async fn discover_users(
    pool: &PgPool,
    config: &Config,
    input: Option<&Path>,
) -> Result<Vec<UserId>> {
    let csv = match (input, &config.input) {
        (Some(path), cfg) => {
            let column = cfg.as_ref().map_or("user_uuid", |c| c.column.as_str());
            Some((path.to_path_buf(), column.to_string()))
        }
        (None, Some(cfg)) => Some((cfg.user_uuids_csv.clone(), cfg.column.clone())),
        (None, None) => None,
    };

    match csv {
        Some((path, column)) => {
            let uuids = read_user_uuids(&path, &column)?;
            info!(file = %path.display(), uuids = uuids.len(), "read user file");
            if uuids.is_empty() {
                warn!(file = %path.display(), "user file lists no users");
                return Ok(Vec::new());
            }
            accounts_for_users(pool, &uuids).await
        }
        None => default_accounts(pool, config.extract.default_user_limit).await,
    }
}

/// Learning account ids of active, non-deleted users with these UUIDs.
async fn accounts_for_users(pool: &PgPool, uuids: &[Uuid]) -> Result<Vec<UserId>> {
    let rows = sqlx::query(
        r#"
        SELECT la.id
        FROM users u
        INNER JOIN learning_accounts la ON u.id = la.base_user_id
        WHERE u.is_active = true
          AND u.deleted_at IS NULL
          AND la.deleted_at IS NULL
          AND u.uuid = ANY($1)
        "#,
    )
    .bind(uuids)
    .fetch_all(pool)
    .await
    .context("Failed to resolve user accounts")?;

    rows.iter().map(account_id).collect()
}

/// The first `limit` non-deleted learning accounts.
async fn default_accounts(pool: &PgPool, limit: i64) -> Result<Vec<UserId>> {
    let rows = sqlx::query(
        "SELECT id FROM learning_accounts WHERE deleted_at IS NULL ORDER BY id LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to list learning accounts")?;

    rows.iter().map(account_id).collect()
}

fn account_id(row: &sqlx::postgres::PgRow) -> Result<UserId> {
    let cell = cell_at(row, 0)?;
    UserId::from_cell(&cell)
        .with_context(|| format!("learning account id {} is not a user identifier", cell))
}

//! Postgres connection management.
//!
//! Both databases are opened once per run and used serially: every
//! entity query and every lookup runs to completion before the next
//! starts. Pools default to a single connection for that reason.
//!
//! Connections are released when the pools are closed via
//! [`Databases::close`] or dropped on an early return.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::{Config, DatabaseConfig};

/// Open handles to the profile and reference databases.
pub struct Databases {
    pub primary: PgPool,
    pub secondary: PgPool,
}

impl Databases {
    /// Connect to both configured databases.
    ///
    /// Fails immediately if either cannot be reached; nothing is retried.
    pub async fn connect(config: &Config) -> Result<Self> {
        let primary = connect(&config.primary)
            .await
            .context("Failed to connect to primary database")?;
        let secondary = connect(&config.secondary)
            .await
            .context("Failed to connect to secondary database")?;
        Ok(Self { primary, secondary })
    }

    pub async fn close(self) {
        self.primary.close().await;
        self.secondary.close().await;
    }
}

/// Create a connection pool for one database.
pub async fn connect(db: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(db.max_connections)
        .acquire_timeout(Duration::from_secs(db.connect_timeout_secs))
        .connect(&db.url)
        .await?;

    Ok(pool)
}

//! Database seams for the pipeline.
//!
//! The [`PrimarySource`] trait fronts the profile database that entity
//! rows come from; [`LookupSource`] fronts the reference database that
//! foreign keys are resolved against. The application crate implements
//! both over Postgres; [`memory`] provides in-process versions for tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//! The pipeline never calls either source concurrently.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::entity::EntitySpec;
use crate::models::{RawRow, UserId};

/// Read-only access to the profile database.
#[async_trait]
pub trait PrimarySource: Send + Sync {
    /// Run the entity's query for one batch of users.
    ///
    /// Rows come back in database order, each with one cell per declared
    /// column. `user_ids` is never empty; callers short-circuit first.
    async fn fetch_rows(&self, entity: &EntitySpec, user_ids: &[UserId]) -> Result<Vec<RawRow>>;
}

/// Read-only access to the reference database.
#[async_trait]
pub trait LookupSource: Send + Sync {
    /// Fetch every non-deleted `(key_column, label_column)` pair of `table`.
    ///
    /// Identifiers have already been validated by the caller.
    async fn fetch_pairs(
        &self,
        table: &str,
        key_column: &str,
        label_column: &str,
    ) -> Result<Vec<(Value, Value)>>;
}

//! In-memory sources for tests and offline runs.
//!
//! [`MemoryPrimary`] holds raw rows per entity name and filters them by
//! the requested user batch; [`MemoryLookup`] holds reference tables.
//! Both log every call so tests can assert how many queries were issued.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::{LookupSource, PrimarySource};
use crate::entity::EntitySpec;
use crate::models::{RawRow, UserId, USER_ID_COLUMN};

/// In-memory profile database.
#[derive(Default)]
pub struct MemoryPrimary {
    rows: HashMap<String, Vec<RawRow>>,
    failing: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl MemoryPrimary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add rows for an entity; they are returned in insertion order.
    pub fn with_rows(mut self, entity: &str, rows: Vec<RawRow>) -> Self {
        self.rows.entry(entity.to_string()).or_default().extend(rows);
        self
    }

    /// Make every query for `entity` fail.
    pub fn failing(mut self, entity: &str) -> Self {
        self.failing.push(entity.to_string());
        self
    }

    /// Entity names queried so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PrimarySource for MemoryPrimary {
    async fn fetch_rows(&self, entity: &EntitySpec, user_ids: &[UserId]) -> Result<Vec<RawRow>> {
        self.calls.lock().unwrap().push(entity.name.to_string());
        if self.failing.iter().any(|f| f == entity.name) {
            bail!("relation \"{}\" does not exist", entity.name);
        }
        let Some(rows) = self.rows.get(entity.name) else {
            return Ok(Vec::new());
        };
        let Some(key) = entity.column_index(USER_ID_COLUMN) else {
            return Ok(rows.clone());
        };
        let wanted: Vec<Value> = user_ids.iter().map(UserId::to_cell).collect();
        Ok(rows
            .iter()
            .filter(|row| row.get(key).map_or(false, |cell| wanted.contains(cell)))
            .cloned()
            .collect())
    }
}

/// In-memory reference database.
#[derive(Default)]
pub struct MemoryLookup {
    tables: HashMap<String, Vec<(Value, Value)>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reference table of `(key, label)` pairs.
    pub fn with_table(mut self, table: &str, pairs: Vec<(Value, Value)>) -> Self {
        self.tables.insert(table.to_string(), pairs);
        self
    }

    /// Tables fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LookupSource for MemoryLookup {
    async fn fetch_pairs(
        &self,
        table: &str,
        _key_column: &str,
        _label_column: &str,
    ) -> Result<Vec<(Value, Value)>> {
        self.calls.lock().unwrap().push(table.to_string());
        match self.tables.get(table) {
            Some(pairs) => Ok(pairs.clone()),
            None => bail!("relation \"{}\" does not exist", table),
        }
    }
}

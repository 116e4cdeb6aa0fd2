//! Reference-table resolution.
//!
//! A [`LookupTable`] maps a foreign-key value, as it appears in a
//! profile row, to the human-readable label held in the reference
//! database. Tables are loaded whole: one query per table, no paging.
//!
//! By default every request refetches the table, so two entity types
//! that both resolve `countries` issue two queries. [`LookupResolver::cached`]
//! memoizes tables per `(table, label_column)` for the lifetime of the
//! resolver instead; reference data does not change within a run.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::entity::validate_identifier;
use crate::error::{PipelineError, PipelineResult};
use crate::source::LookupSource;

/// Foreign-key value → label, for one reference table.
pub type LookupTable = HashMap<String, Value>;

/// Normalize a key cell to the string form used by [`LookupTable`].
///
/// Strings are used as-is and numbers by their decimal text, so an
/// integer key and a UUID key are matched the same way. Null and
/// composite values have no key and never match.
pub fn lookup_key(cell: &Value) -> Option<String> {
    match cell {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Loads reference tables from a [`LookupSource`].
pub struct LookupResolver<'a, L: LookupSource + ?Sized> {
    source: &'a L,
    cache: Option<HashMap<(String, String), Arc<LookupTable>>>,
}

impl<'a, L: LookupSource + ?Sized> LookupResolver<'a, L> {
    /// Resolver that fetches every table on every request.
    pub fn new(source: &'a L) -> Self {
        Self {
            source,
            cache: None,
        }
    }

    /// Resolver that fetches each `(table, label_column)` at most once.
    pub fn cached(source: &'a L) -> Self {
        Self {
            source,
            cache: Some(HashMap::new()),
        }
    }

    /// Load `table` as a [`LookupTable`] keyed by `key_column`.
    ///
    /// Rows with a null key are skipped. When two rows share a key the
    /// first one wins.
    pub async fn resolve(
        &mut self,
        table: &str,
        key_column: &str,
        label_column: &str,
    ) -> PipelineResult<Arc<LookupTable>> {
        validate_identifier(table)?;
        validate_identifier(key_column)?;
        validate_identifier(label_column)?;

        let cache_key = (table.to_string(), label_column.to_string());
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(&cache_key)) {
            debug!(table, label_column, "lookup table served from cache");
            return Ok(Arc::clone(hit));
        }

        let pairs = self
            .source
            .fetch_pairs(table, key_column, label_column)
            .await
            .map_err(|e| PipelineError::Lookup {
                table: table.to_string(),
                label_column: label_column.to_string(),
                source: e.into(),
            })?;

        let mut lookup = LookupTable::with_capacity(pairs.len());
        for (key, label) in pairs {
            if let Some(key) = lookup_key(&key) {
                lookup.entry(key).or_insert(label);
            }
        }
        debug!(table, label_column, entries = lookup.len(), "lookup table loaded");

        let lookup = Arc::new(lookup);
        if let Some(cache) = self.cache.as_mut() {
            cache.insert(cache_key, Arc::clone(&lookup));
        }
        Ok(lookup)
    }
}

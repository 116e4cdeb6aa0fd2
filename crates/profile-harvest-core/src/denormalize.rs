//! Row denormalization: foreign keys to labels.
//!
//! Each raw row becomes a named [`EntityRecord`]. Lookup columns are
//! left-joined against their reference table: the raw key is dropped
//! and the label is appended under the lookup's target name. A key with
//! no match (or a null key) resolves to `""`, the same as any other
//! null cell. Lookups are applied independently of one another: each
//! label depends only on its own key column. Label fields are appended
//! in the order the lookups are declared.

use crate::entity::{EntitySpec, LookupSpec};
use crate::error::PipelineResult;
use crate::lookup::{lookup_key, LookupResolver, LookupTable};
use crate::models::{EntityRecord, RawRow};
use crate::source::LookupSource;
use serde_json::Value;
use tracing::debug;

/// Denormalize rows, loading each lookup table through `resolver`.
///
/// No lookup table is fetched when there are no rows.
pub async fn denormalize<L: LookupSource + ?Sized>(
    resolver: &mut LookupResolver<'_, L>,
    entity: &EntitySpec,
    rows: Vec<RawRow>,
) -> PipelineResult<Vec<EntityRecord>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut tables = Vec::with_capacity(entity.lookups.len());
    for lookup in entity.lookups {
        let table = resolver
            .resolve(lookup.table, lookup.key_column, lookup.label_column)
            .await?;
        tables.push(table);
    }

    let joins: Vec<(&LookupSpec, &LookupTable)> = entity
        .lookups
        .iter()
        .zip(tables.iter().map(|t| t.as_ref()))
        .collect();
    denormalize_rows(entity, rows, &joins)
}

/// Denormalize rows against already-loaded lookup tables.
///
/// Field order is the entity's column order with lookup columns removed,
/// followed by one label field per join in `joins` order.
pub fn denormalize_rows(
    entity: &EntitySpec,
    rows: Vec<RawRow>,
    joins: &[(&LookupSpec, &LookupTable)],
) -> PipelineResult<Vec<EntityRecord>> {
    let join_indices = joins
        .iter()
        .map(|(spec, _)| entity.require_column(spec.column))
        .collect::<PipelineResult<Vec<_>>>()?;

    let mut misses = vec![0usize; joins.len()];
    let records = rows
        .into_iter()
        .map(|row| {
            let mut record = EntityRecord::new();
            for (idx, (column, cell)) in entity.columns.iter().zip(row.iter()).enumerate() {
                if join_indices.contains(&idx) {
                    continue;
                }
                record.insert((*column).to_string(), fill_null(cell.clone()));
            }
            for (j, ((spec, table), idx)) in joins.iter().zip(&join_indices).enumerate() {
                let key = row.get(*idx).and_then(lookup_key);
                let label = key.as_ref().and_then(|key| table.get(key)).cloned();
                if key.is_some() && label.is_none() {
                    misses[j] += 1;
                }
                record.insert(spec.target.to_string(), fill_null(label.unwrap_or(Value::Null)));
            }
            record
        })
        .collect();

    for ((spec, _), count) in joins.iter().zip(&misses) {
        if *count > 0 {
            debug!(entity = entity.name, table = spec.table, misses = *count, "unresolved foreign keys");
        }
    }
    Ok(records)
}

/// Missing values are carried as empty strings.
fn fill_null(cell: Value) -> Value {
    match cell {
        Value::Null => Value::String(String::new()),
        other => other,
    }
}

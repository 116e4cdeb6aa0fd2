//! Folding records into per-user lists.

use std::collections::HashMap;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{EntityRecord, UserId};

/// User → that user's records of one entity type, in arrival order.
pub type Grouping = HashMap<UserId, Vec<EntityRecord>>;

/// Partition records by the `group_key` field.
///
/// The key field is removed from every grouped record; it lives on as
/// the map key. Users with no records are simply absent. A record whose
/// key is missing or is not a user identifier fails the whole group,
/// since dropping it would silently lose a row.
pub fn group(
    entity: &'static str,
    records: Vec<EntityRecord>,
    group_key: &str,
) -> PipelineResult<Grouping> {
    let mut grouping = Grouping::new();
    for record in records {
        let user_id = match record.get(group_key) {
            Some(cell) => UserId::from_cell(cell).ok_or_else(|| PipelineError::BadUserId {
                entity,
                column: group_key.to_string(),
                value: cell.clone(),
            })?,
            None => {
                return Err(PipelineError::MissingColumn {
                    entity,
                    column: group_key.to_string(),
                })
            }
        };
        let stripped: EntityRecord = record
            .into_iter()
            .filter(|(field, _)| field != group_key)
            .collect();
        grouping.entry(user_id).or_default().push(stripped);
    }
    Ok(grouping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::USER_ID_COLUMN;
    use serde_json::{json, Value};

    fn record(pairs: &[(&str, Value)]) -> EntityRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_groups_preserve_order_and_drop_key() {
        let records = vec![
            record(&[("user_id", json!(7)), ("skill", json!("a"))]),
            record(&[("user_id", json!(8)), ("skill", json!("b"))]),
            record(&[("user_id", json!(7)), ("skill", json!("c"))]),
        ];
        let grouping = group("user_skills", records, USER_ID_COLUMN).unwrap();
        assert_eq!(grouping.len(), 2);

        let seven = &grouping[&UserId::Int(7)];
        assert_eq!(seven.len(), 2);
        assert_eq!(seven[0]["skill"], json!("a"));
        assert_eq!(seven[1]["skill"], json!("c"));

        for records in grouping.values() {
            for r in records {
                assert!(!r.contains_key(USER_ID_COLUMN));
            }
        }
    }

    #[test]
    fn test_absent_user_not_in_grouping() {
        let records = vec![record(&[("user_id", json!(1)), ("x", json!(""))])];
        let grouping = group("e", records, USER_ID_COLUMN).unwrap();
        assert!(!grouping.contains_key(&UserId::Int(2)));
    }

    #[test]
    fn test_empty_key_is_error() {
        let records = vec![record(&[("user_id", json!("")), ("x", json!(1))])];
        let err = group("e", records, USER_ID_COLUMN).unwrap_err();
        assert!(matches!(err, PipelineError::BadUserId { .. }));
    }

    #[test]
    fn test_missing_key_is_error() {
        let records = vec![record(&[("x", json!(1))])];
        let err = group("e", records, USER_ID_COLUMN).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { .. }));
    }
}

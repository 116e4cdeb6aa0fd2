//! Entity extraction: one query per entity type per batch.
//!
//! Rows are checked against the entity's column list and their code
//! columns are decoded to labels before they leave this module, so
//! later stages only ever see the declared shape.

use tracing::debug;

use crate::entity::EntitySpec;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{RawRow, UserId};
use crate::source::PrimarySource;

/// Fetch the raw rows of one entity type for a batch of users.
///
/// An empty batch returns no rows without touching the database, which
/// would otherwise reject an empty identifier list. Zero rows for a
/// non-empty batch is a normal outcome.
pub async fn extract<P: PrimarySource + ?Sized>(
    primary: &P,
    entity: &EntitySpec,
    user_ids: &[UserId],
) -> PipelineResult<Vec<RawRow>> {
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut rows = primary
        .fetch_rows(entity, user_ids)
        .await
        .map_err(|e| PipelineError::Extract {
            entity: entity.name,
            source: e.into(),
        })?;

    let code_columns = entity
        .codes
        .iter()
        .map(|c| Ok((entity.require_column(c.column)?, c)))
        .collect::<PipelineResult<Vec<_>>>()?;

    for row in &mut rows {
        if row.len() != entity.columns.len() {
            return Err(PipelineError::ColumnCount {
                entity: entity.name,
                expected: entity.columns.len(),
                actual: row.len(),
            });
        }
        for (idx, code) in &code_columns {
            let decoded = code
                .kind
                .decode(&row[*idx])
                .ok_or_else(|| PipelineError::UnknownCode {
                    entity: entity.name,
                    column: code.column,
                    kind: code.kind.name(),
                    code: row[*idx].clone(),
                })?;
            row[*idx] = decoded;
        }
    }

    debug!(
        entity = entity.name,
        users = user_ids.len(),
        rows = rows.len(),
        "extracted rows"
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::CodeKind;
    use crate::entity::CodeColumn;
    use crate::source::memory::MemoryPrimary;
    use serde_json::{json, Value};

    const LANGUAGES: EntitySpec = EntitySpec {
        name: "user_languages",
        query: "",
        columns: &["user_id", "language_id", "proficiency"],
        lookups: &[],
        codes: &[CodeColumn {
            column: "proficiency",
            kind: CodeKind::Proficiency,
        }],
    };

    #[tokio::test]
    async fn test_empty_batch_issues_no_query() {
        let primary = MemoryPrimary::new().with_rows("user_languages", vec![vec![
            json!(1),
            json!(1),
            json!(5),
        ]]);
        let rows = extract(&primary, &LANGUAGES, &[]).await.unwrap();
        assert!(rows.is_empty());
        assert!(primary.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rows_filtered_and_decoded() {
        let primary = MemoryPrimary::new().with_rows(
            "user_languages",
            vec![
                vec![json!(1), json!(10), json!(5)],
                vec![json!(2), json!(11), json!(1)],
                vec![json!(1), json!(12), Value::Null],
            ],
        );
        let rows = extract(&primary, &LANGUAGES, &[UserId::Int(1)])
            .await
            .unwrap();
        assert_eq!(
            rows,
            vec![
                vec![json!(1), json!(10), json!("NATIVE")],
                vec![json!(1), json!(12), Value::Null],
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_code_fails() {
        let primary = MemoryPrimary::new()
            .with_rows("user_languages", vec![vec![json!(1), json!(10), json!(9)]]);
        let err = extract(&primary, &LANGUAGES, &[UserId::Int(1)])
            .await
            .unwrap_err();
        match err {
            PipelineError::UnknownCode { column, code, .. } => {
                assert_eq!(column, "proficiency");
                assert_eq!(code, json!(9));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_short_row_is_shape_error() {
        let primary =
            MemoryPrimary::new().with_rows("user_languages", vec![vec![json!(1), json!(10)]]);
        let err = extract(&primary, &LANGUAGES, &[UserId::Int(1)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ColumnCount {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_query_failure_names_entity() {
        let primary = MemoryPrimary::new().failing("user_languages");
        let err = extract(&primary, &LANGUAGES, &[UserId::Int(1)])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("user_languages"));
    }
}

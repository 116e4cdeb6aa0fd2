//! Core data models that flow through the aggregation pipeline.
//!
//! Cells are plain [`serde_json::Value`]s so that rows from either
//! database, computed columns, and aggregated sub-lists share one shape.
//! With `preserve_order` enabled, an [`EntityRecord`] keeps its fields in
//! insertion order, which is the order they are serialized in.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Column that carries the owning user on every entity row.
pub const USER_ID_COLUMN: &str = "user_id";

/// One positional row as returned by a primary database query.
///
/// Cells line up 1:1 with the entity's column list.
pub type RawRow = Vec<Value>;

/// A denormalized row: named fields, labels resolved, nulls replaced by `""`.
pub type EntityRecord = Map<String, Value>;

/// Identifier of one user; the join key for every entity type.
///
/// Serialized as a bare JSON number or a UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Int(i64),
    Uuid(Uuid),
}

impl UserId {
    /// Read a user identifier out of a cell.
    ///
    /// Accepts integer numbers and UUID strings. Anything else (floats,
    /// arbitrary strings, null) returns `None`.
    pub fn from_cell(cell: &Value) -> Option<Self> {
        match cell {
            Value::Number(n) => n.as_i64().map(UserId::Int),
            Value::String(s) => Uuid::parse_str(s).ok().map(UserId::Uuid),
            _ => None,
        }
    }

    /// The identifier as a cell, for comparisons against row values.
    pub fn to_cell(&self) -> Value {
        match self {
            UserId::Int(id) => Value::from(*id),
            UserId::Uuid(id) => Value::String(id.to_string()),
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Int(id) => write!(f, "{}", id),
            UserId::Uuid(id) => write!(f, "{}", id),
        }
    }
}

/// The composite per-user document.
///
/// Holds one entry per registered entity type, in registry order, even
/// when the user has no rows of that type. Serializes as a flat object:
/// `{"user_id": 7, "user_awards": [...], ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserDocument {
    pub user_id: UserId,
    pub entities: Vec<(&'static str, Vec<EntityRecord>)>,
}

impl UserDocument {
    /// Records of one entity type, or `None` if the type is not registered.
    pub fn get(&self, entity: &str) -> Option<&[EntityRecord]> {
        self.entities
            .iter()
            .find(|(name, _)| *name == entity)
            .map(|(_, records)| records.as_slice())
    }

    /// Entity type names present on this document, in order.
    pub fn entity_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entities.iter().map(|(name, _)| *name)
    }
}

impl Serialize for UserDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entities.len() + 1))?;
        map.serialize_entry(USER_ID_COLUMN, &self.user_id)?;
        for (name, records) in &self.entities {
            map.serialize_entry(name, records)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_id_from_cell() {
        assert_eq!(UserId::from_cell(&json!(7)), Some(UserId::Int(7)));
        let uuid = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        assert_eq!(
            UserId::from_cell(&json!(uuid)),
            Some(UserId::Uuid(Uuid::parse_str(uuid).unwrap()))
        );
        assert_eq!(UserId::from_cell(&json!(1.5)), None);
        assert_eq!(UserId::from_cell(&json!("seven")), None);
        assert_eq!(UserId::from_cell(&Value::Null), None);
    }

    #[test]
    fn user_id_serializes_bare() {
        assert_eq!(serde_json::to_string(&UserId::Int(42)).unwrap(), "42");
        let id: UserId = serde_json::from_str("42").unwrap();
        assert_eq!(id, UserId::Int(42));
    }

    #[test]
    fn document_serializes_flat_in_order() {
        let mut record = EntityRecord::new();
        record.insert("interest".into(), json!("chess"));
        let doc = UserDocument {
            user_id: UserId::Int(3),
            entities: vec![("user_interests", vec![record]), ("user_skills", vec![])],
        };
        let text = serde_json::to_string(&doc).unwrap();
        assert_eq!(
            text,
            r#"{"user_id":3,"user_interests":[{"interest":"chess"}],"user_skills":[]}"#
        );
        assert_eq!(doc.get("user_skills").map(|r| r.len()), Some(0));
        assert!(doc.get("user_awards").is_none());
    }
}

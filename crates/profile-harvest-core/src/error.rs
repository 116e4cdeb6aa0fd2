//! Error types for the aggregation pipeline.
//!
//! Every failure here is fatal to the batch being assembled. Lookup
//! misses are not errors and never show up in this enum.

use thiserror::Error;

/// Boxed error carried from a [`PrimarySource`](crate::source::PrimarySource)
/// or [`LookupSource`](crate::source::LookupSource) implementation.
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Pipeline error type.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The primary database query for an entity type failed.
    #[error("extraction of '{entity}' failed: {source}")]
    Extract {
        entity: &'static str,
        #[source]
        source: SourceError,
    },

    /// The secondary database query for a lookup table failed.
    #[error("lookup of {table}.{label_column} failed: {source}")]
    Lookup {
        table: String,
        label_column: String,
        #[source]
        source: SourceError,
    },

    /// A row did not match the entity's declared column list.
    #[error("entity '{entity}': expected {expected} columns, got {actual}")]
    ColumnCount {
        entity: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A column named by a lookup, code, or group key is absent.
    #[error("entity '{entity}': column '{column}' is not present")]
    MissingColumn {
        entity: &'static str,
        column: String,
    },

    /// The group key cell could not be read as a user identifier.
    #[error("entity '{entity}': value {value} in '{column}' is not a user identifier")]
    BadUserId {
        entity: &'static str,
        column: String,
        value: serde_json::Value,
    },

    /// An enum code column held a value outside its code table.
    #[error("entity '{entity}': unknown {kind} code {code} in column '{column}'")]
    UnknownCode {
        entity: &'static str,
        column: &'static str,
        kind: &'static str,
        code: serde_json::Value,
    },

    /// A table or column name is not a plain SQL identifier.
    #[error("invalid SQL identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("batch size must be greater than zero")]
    ZeroBatchSize,
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

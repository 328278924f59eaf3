//! Failure taxonomy of the ingestion engine.
//!
//! Type-mapping gaps never fail: unrecognised source types degrade to
//! `String`/`Unknown` columns instead. Every other failure aborts the upload
//! call it occurred in and carries enough context (table, SQL text,
//! predicate, path) to diagnose it without re-deriving anything.

use std::path::PathBuf;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The synthesized table definition breaks its own invariants.
    #[error("invalid schema for table '{table}': {detail}")]
    InvalidSchema { table: String, detail: String },

    /// The destination store rejected the generated DDL.
    #[error("failed to provision table '{table}': {source}\n{sql}")]
    Provisioning {
        table: String,
        sql: String,
        #[source]
        source: BoxError,
    },

    /// The existence check or the row-deletion mutation was rejected.
    #[error("failed to purge rows from '{table}' where {predicate}: {source}")]
    Purge {
        table: String,
        predicate: String,
        #[source]
        source: BoxError,
    },

    /// The bulk insert failed as a whole.
    #[error("failed to load {rows} row(s) into '{table}': {source}")]
    Load {
        table: String,
        rows: usize,
        #[source]
        source: BoxError,
    },

    /// The source warehouse could not describe the table.
    #[error("failed to fetch schema for '{table_ref}': {source}")]
    SchemaFetch {
        table_ref: String,
        #[source]
        source: BoxError,
    },

    /// Source rows could not be read or serialized.
    #[error("failed to read source rows from {path:?}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

impl IngestError {
    pub fn invalid_schema(table: impl Into<String>, detail: impl Into<String>) -> Self {
        IngestError::InvalidSchema {
            table: table.into(),
            detail: detail.into(),
        }
    }

    pub fn table(&self) -> Option<&str> {
        match self {
            IngestError::InvalidSchema { table, .. }
            | IngestError::Provisioning { table, .. }
            | IngestError::Purge { table, .. }
            | IngestError::Load { table, .. } => Some(table),
            IngestError::SchemaFetch { .. } | IngestError::Source { .. } => None,
        }
    }
}

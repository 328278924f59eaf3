//! Destination-store collaborator.
//!
//! The engine only needs four things from the columnar store: run a
//! statement, ask whether a table exists, bulk-insert a batch of JSON rows,
//! and release the session. Wire protocol and credentials live behind this
//! trait.

pub mod memory;
pub mod script;

use std::fmt;

use anyhow::Result;
use serde_json::{Map, Value as JsonValue};

pub type JsonRow = Map<String, JsonValue>;
pub type Row = Vec<JsonValue>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub database: String,
    pub table: String,
}

impl TableRef {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

pub trait DestinationStore {
    /// Database of the current session; used when a call names none.
    fn database(&self) -> &str;

    fn execute(&mut self, sql: &str) -> Result<Vec<Row>>;

    fn exists(&mut self, table: &TableRef) -> Result<bool>;

    /// Inserts the whole batch in one call and returns the number of rows the
    /// store reports as written.
    fn bulk_insert(&mut self, table: &TableRef, rows: &[JsonRow]) -> Result<u64>;

    /// Releases the session. Must be safe to call more than once.
    fn disconnect(&mut self) {}
}

impl<S: DestinationStore + ?Sized> DestinationStore for &mut S {
    fn database(&self) -> &str {
        (**self).database()
    }

    fn execute(&mut self, sql: &str) -> Result<Vec<Row>> {
        (**self).execute(sql)
    }

    fn exists(&mut self, table: &TableRef) -> Result<bool> {
        (**self).exists(table)
    }

    fn bulk_insert(&mut self, table: &TableRef, rows: &[JsonRow]) -> Result<u64> {
        (**self).bulk_insert(table, rows)
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }
}

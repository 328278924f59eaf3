//! Bulk-write step: serialize rows to the store's insert form and issue a
//! single bulk insert. Either the whole batch lands or the call fails.

use log::{debug, info};
use serde_json::Value as JsonValue;

use crate::{
    dataset::Dataset,
    document::Document,
    error::IngestError,
    store::{DestinationStore, JsonRow, TableRef},
    value::Value,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadResult {
    pub rows_written: u64,
}

/// Rewrites every present value of a generic (`object`) column as text.
/// Returns the number of columns touched.
pub fn coerce_object_columns(dataset: &mut Dataset) -> usize {
    let mut coerced = 0usize;
    for column in dataset.columns_mut() {
        if !column.dtype.is_generic() {
            continue;
        }
        for value in column.values.iter_mut().flatten() {
            if !matches!(value, Value::String(_)) {
                *value = Value::String(value.as_display());
            }
        }
        debug!("Coerced object column '{}' to text", column.name);
        coerced += 1;
    }
    coerced
}

pub fn dataset_rows(dataset: &Dataset) -> Vec<JsonRow> {
    let names = dataset
        .columns()
        .iter()
        .map(|c| c.name.clone())
        .collect::<Vec<_>>();
    dataset
        .rows()
        .map(|row| {
            names
                .iter()
                .zip(row)
                .map(|(name, value)| {
                    let json = value.map(Value::to_json).unwrap_or(JsonValue::Null);
                    (name.clone(), json)
                })
                .collect()
        })
        .collect()
}

/// Loads a tabular dataset. Generic columns are coerced to text first.
pub fn load_dataset(
    store: &mut dyn DestinationStore,
    table: &str,
    dataset: &mut Dataset,
    database: Option<&str>,
) -> Result<LoadResult, IngestError> {
    coerce_object_columns(dataset);
    let rows = dataset_rows(dataset);
    insert(store, table, &rows, database)
}

/// Loads exported documents. Every document must be a JSON object; anything
/// else fails the whole batch before the store is called.
pub fn load_documents(
    store: &mut dyn DestinationStore,
    table: &str,
    documents: Vec<Document>,
    database: Option<&str>,
) -> Result<LoadResult, IngestError> {
    let total = documents.len();
    let target = TableRef::new(database.unwrap_or(store.database()), table).to_string();
    let rows = documents
        .into_iter()
        .enumerate()
        .map(|(idx, document)| match document {
            JsonValue::Object(map) => Ok(map),
            other => Err(IngestError::Load {
                table: target.clone(),
                rows: total,
                source: format!("document {idx} is not a JSON object: {other}").into(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    insert(store, table, &rows, database)
}

fn insert(
    store: &mut dyn DestinationStore,
    table: &str,
    rows: &[JsonRow],
    database: Option<&str>,
) -> Result<LoadResult, IngestError> {
    let target = TableRef::new(database.unwrap_or(store.database()), table);
    let rows_written = store
        .bulk_insert(&target, rows)
        .map_err(|err| IngestError::Load {
            table: target.to_string(),
            rows: rows.len(),
            source: err.into(),
        })?;
    info!("Inserted {rows_written} record(s) into {target}");
    Ok(LoadResult { rows_written })
}

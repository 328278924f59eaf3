//! Upload flows: provision → purge (optional) → load, strictly in that order.
//!
//! An [`Ingestor`] owns one destination session for its lifetime and releases
//! it when dropped, whichever step failed. It assumes at most one in-flight
//! upload per destination table; concurrent uploads to the same table can
//! interleave their purges and inserts.

use std::path::Path;

use log::info;

use crate::{
    dataset::Dataset,
    document::{self, DocumentSchema, WarehouseClient},
    error::IngestError,
    loader::{self, LoadResult},
    provision, purge,
    schema::SourceSchema,
    store::DestinationStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub destination_table: String,
    pub sort_key: String,
    pub partition_key: Option<String>,
    pub purge_predicate: Option<String>,
}

impl LoadRequest {
    pub fn new(destination_table: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            destination_table: destination_table.into(),
            sort_key: sort_key.into(),
            partition_key: None,
            purge_predicate: None,
        }
    }

    pub fn partition_by(mut self, key: impl Into<String>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    pub fn purge_where(mut self, predicate: impl Into<String>) -> Self {
        self.purge_predicate = Some(predicate.into());
        self
    }
}

pub struct Ingestor<S: DestinationStore> {
    store: S,
}

impl<S: DestinationStore> Ingestor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Tabular flow. Returns the number of rows the store reports written.
    pub fn upload_dataset(
        &mut self,
        mut dataset: Dataset,
        request: &LoadRequest,
    ) -> Result<u64, IngestError> {
        loader::coerce_object_columns(&mut dataset);
        let source = SourceSchema::from(&dataset);
        let result = self.run(&source, request, None, |store| {
            loader::load_dataset(store, &request.destination_table, &mut dataset, None)
        })?;
        Ok(result.rows_written)
    }

    /// Document-export flow. The whole export is sent as one insert; no row
    /// count is returned, callers verify counts against the store themselves.
    pub fn upload_export(
        &mut self,
        schema: &DocumentSchema,
        source_file: &Path,
        request: &LoadRequest,
        database: Option<&str>,
    ) -> Result<(), IngestError> {
        let source = SourceSchema::DocumentTree(schema.clone());
        self.run(&source, request, database, |store| {
            let documents = document::read_exported_documents(source_file).map_err(|err| {
                IngestError::Source {
                    path: source_file.to_path_buf(),
                    source: err.into(),
                }
            })?;
            loader::load_documents(store, &request.destination_table, documents, database)
        })?;
        Ok(())
    }

    /// Fetches the document schema from `client`, then runs the
    /// document-export flow with documents read through the same client.
    pub fn upload_warehouse_table(
        &mut self,
        client: &dyn WarehouseClient,
        table_ref: &str,
        source_file: &Path,
        request: &LoadRequest,
        database: Option<&str>,
    ) -> Result<(), IngestError> {
        let schema = client
            .fetch_schema(table_ref)
            .map_err(|err| IngestError::SchemaFetch {
                table_ref: table_ref.to_string(),
                source: err.into(),
            })?;
        let source = SourceSchema::DocumentTree(schema);
        self.run(&source, request, database, |store| {
            let documents = client
                .read_exported_documents(source_file)
                .map_err(|err| IngestError::Source {
                    path: source_file.to_path_buf(),
                    source: err.into(),
                })?;
            loader::load_documents(store, &request.destination_table, documents, database)
        })?;
        Ok(())
    }

    fn run<F>(
        &mut self,
        source: &SourceSchema,
        request: &LoadRequest,
        database: Option<&str>,
        load: F,
    ) -> Result<LoadResult, IngestError>
    where
        F: FnOnce(&mut dyn DestinationStore) -> Result<LoadResult, IngestError>,
    {
        info!(
            "Uploading {} field(s) into '{}'",
            source.field_count(),
            request.destination_table
        );
        provision::ensure_table(
            &mut self.store,
            source,
            &request.destination_table,
            &request.sort_key,
            request.partition_key.as_deref(),
            database,
        )?;
        if let Some(predicate) = &request.purge_predicate {
            purge::purge(
                &mut self.store,
                &request.destination_table,
                predicate,
                database,
            )?;
        }
        load(&mut self.store)
    }
}

impl<S: DestinationStore> Drop for Ingestor<S> {
    fn drop(&mut self) {
        self.store.disconnect();
    }
}

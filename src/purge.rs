use log::{debug, info};

use crate::{
    error::IngestError,
    store::{DestinationStore, TableRef},
};

/// Deletes the rows matching `predicate` from an existing table.
///
/// The predicate is passed to the store verbatim; the caller owns its
/// correctness and injection safety. A missing table is a no-op. The store
/// applies the mutation asynchronously; this only waits for it to be
/// accepted.
pub fn purge(
    store: &mut dyn DestinationStore,
    table: &str,
    predicate: &str,
    database: Option<&str>,
) -> Result<(), IngestError> {
    let target = TableRef::new(database.unwrap_or(store.database()), table);
    let purge_error = |err: anyhow::Error| IngestError::Purge {
        table: target.to_string(),
        predicate: predicate.to_string(),
        source: err.into(),
    };

    if !store.exists(&target).map_err(purge_error)? {
        debug!("Table {target} does not exist; nothing to purge");
        return Ok(());
    }
    let sql = format!("ALTER TABLE {target} DELETE WHERE {predicate}");
    info!("Purging rows: {sql}");
    store.execute(&sql).map_err(purge_error)?;
    Ok(())
}

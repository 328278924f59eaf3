use log::info;

use crate::{
    ddl::{self, TableSpec},
    error::IngestError,
    schema::{self, SourceSchema},
    store::DestinationStore,
};

/// Builds the table definition from `source` and creates the table when it
/// is absent. An existing table is never altered, even when its definition
/// differs from the one computed here.
pub fn ensure_table(
    store: &mut dyn DestinationStore,
    source: &SourceSchema,
    table: &str,
    sort_key: &str,
    partition_key: Option<&str>,
    database: Option<&str>,
) -> Result<TableSpec, IngestError> {
    let fields = schema::build(source);
    let spec = TableSpec::new(table, fields, sort_key, partition_key.map(str::to_string))?;
    let database = database.unwrap_or(store.database()).to_string();
    let sql = ddl::generate(&spec, &database);
    info!("Creating table\n{sql}");
    store
        .execute(&sql)
        .map_err(|err| IngestError::Provisioning {
            table: format!("{database}.{table}"),
            sql: sql.clone(),
            source: err.into(),
        })?;
    Ok(spec)
}

//! Destination store that writes a replayable SQL script instead of talking
//! to a server. The output is accepted by `clickhouse-client --multiquery`.
//!
//! A table counts as existing once its `CREATE TABLE IF NOT EXISTS` has been
//! scripted, so purges that follow provisioning are always emitted.

use std::{collections::HashSet, io::Write};

use anyhow::{Context, Result};

use super::{DestinationStore, JsonRow, Row, TableRef};

const CREATE_PREFIX: &str = "CREATE TABLE IF NOT EXISTS ";

pub struct ScriptStore<W: Write> {
    database: String,
    writer: W,
    known_tables: HashSet<String>,
    statements: usize,
}

impl<W: Write> ScriptStore<W> {
    pub fn new(database: impl Into<String>, writer: W) -> Self {
        Self {
            database: database.into(),
            writer,
            known_tables: HashSet::new(),
            statements: 0,
        }
    }

    pub fn statements(&self) -> usize {
        self.statements
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_statement(&mut self, text: &str) -> Result<()> {
        let text = text.trim_end();
        let terminator = if text.ends_with(';') { "" } else { ";" };
        writeln!(self.writer, "{text}{terminator}\n").context("Writing SQL script")?;
        self.statements += 1;
        Ok(())
    }
}

impl<W: Write> DestinationStore for ScriptStore<W> {
    fn database(&self) -> &str {
        &self.database
    }

    fn execute(&mut self, sql: &str) -> Result<Vec<Row>> {
        if let Some(rest) = sql.trim_start().strip_prefix(CREATE_PREFIX)
            && let Some(name) = rest.split_whitespace().next()
        {
            self.known_tables.insert(name.to_string());
        }
        self.write_statement(sql)?;
        Ok(Vec::new())
    }

    fn exists(&mut self, table: &TableRef) -> Result<bool> {
        Ok(self.known_tables.contains(&table.to_string()))
    }

    fn bulk_insert(&mut self, table: &TableRef, rows: &[JsonRow]) -> Result<u64> {
        writeln!(self.writer, "INSERT INTO {table} FORMAT JSONEachRow")
            .context("Writing SQL script")?;
        for row in rows {
            serde_json::to_writer(&mut self.writer, row).context("Serializing row")?;
            writeln!(self.writer).context("Writing SQL script")?;
        }
        writeln!(self.writer, ";\n").context("Writing SQL script")?;
        self.statements += 1;
        Ok(rows.len() as u64)
    }

    fn disconnect(&mut self) {
        if let Err(err) = self.writer.flush() {
            log::error!("Failed to flush SQL script: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn created_tables_become_known() {
        let mut store = ScriptStore::new("db", Vec::new());
        let events = TableRef::new("db", "events");
        assert!(!store.exists(&events).unwrap());
        store
            .execute("CREATE TABLE IF NOT EXISTS db.events\n(\nid Int64\n)\nENGINE = MergeTree()\nORDER BY id;")
            .unwrap();
        assert!(store.exists(&events).unwrap());
    }

    #[test]
    fn bulk_insert_writes_json_each_row() {
        let mut store = ScriptStore::new("db", Vec::new());
        let rows = vec![
            json!({"id": 1}).as_object().cloned().unwrap(),
            json!({"id": 2}).as_object().cloned().unwrap(),
        ];
        let written = store
            .bulk_insert(&TableRef::new("db", "events"), &rows)
            .unwrap();
        assert_eq!(written, 2);
        let script = String::from_utf8(store.into_inner()).unwrap();
        assert_eq!(
            script,
            "INSERT INTO db.events FORMAT JSONEachRow\n{\"id\":1}\n{\"id\":2}\n;\n\n"
        );
    }

    #[test]
    fn statements_are_terminated_once() {
        let mut store = ScriptStore::new("db", Vec::new());
        store.execute("ALTER TABLE db.t DELETE WHERE id = 1").unwrap();
        store.execute("SELECT 1;").unwrap();
        let script = String::from_utf8(store.into_inner()).unwrap();
        assert_eq!(
            script,
            "ALTER TABLE db.t DELETE WHERE id = 1;\n\nSELECT 1;\n\n"
        );
    }
}

//! In-process destination store.
//!
//! Understands exactly the statements the engine emits: the generated
//! `CREATE TABLE IF NOT EXISTS`, `ALTER TABLE .. DELETE WHERE ..`, and
//! `SELECT count() FROM ..`. Purge predicates are evaluated row by row with
//! `evalexpr` after translating the SQL operators it does not share.

use std::{
    collections::BTreeMap,
    sync::OnceLock,
};

use anyhow::{Context, Result, anyhow, bail};
use evalexpr::{
    ContextWithMutableVariables, HashMapContext, Node, Value as EvalValue, build_operator_tree,
};
use log::debug;
use regex::Regex;
use serde_json::Value as JsonValue;

use super::{DestinationStore, JsonRow, Row, TableRef};

const TYPE_FAMILIES: &[&str] = &[
    "Int8", "Int16", "Int32", "Int64", "UInt8", "UInt16", "UInt32", "UInt64", "Float32",
    "Float64", "String", "Date", "Date32", "DateTime", "DateTime64", "Bool", "UUID",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryTable {
    pub columns: Vec<(String, String)>,
    pub rows: Vec<JsonRow>,
}

impl MemoryTable {
    fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(column, _)| column == name)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    database: String,
    tables: BTreeMap<String, MemoryTable>,
    statements: Vec<String>,
    creations: usize,
    inserts: usize,
    disconnects: usize,
    rejections: Vec<String>,
}

impl MemoryStore {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    /// Makes every statement containing `fragment` fail, the way a store
    /// rejects SQL it cannot run.
    pub fn reject_statements_containing(&mut self, fragment: impl Into<String>) {
        self.rejections.push(fragment.into());
    }

    /// Inserts rows directly, bypassing the statement log.
    pub fn seed(&mut self, table: &TableRef, rows: Vec<JsonRow>) -> Result<()> {
        let entry = self
            .tables
            .get_mut(&table.to_string())
            .ok_or_else(|| anyhow!("Table {table} doesn't exist"))?;
        entry.rows.extend(rows);
        Ok(())
    }

    pub fn table(&self, table: &TableRef) -> Option<&MemoryTable> {
        self.tables.get(&table.to_string())
    }

    pub fn row_count(&self, table: &TableRef) -> Option<usize> {
        self.table(table).map(|t| t.rows.len())
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Number of tables actually created (existing tables do not count).
    pub fn creations(&self) -> usize {
        self.creations
    }

    pub fn inserts(&self) -> usize {
        self.inserts
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects
    }

    fn create_table(&mut self, name: &str, body: &str) -> Result<()> {
        let columns = split_top_level(body, ",\n")
            .into_iter()
            .map(|line| {
                let (column, ty) = line
                    .trim()
                    .split_once(' ')
                    .ok_or_else(|| anyhow!("Malformed column definition '{line}'"))?;
                validate_type(ty.trim())?;
                Ok((column.to_string(), ty.trim().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        if self.tables.contains_key(name) {
            debug!("Table {name} already exists");
            return Ok(());
        }
        self.tables.insert(
            name.to_string(),
            MemoryTable {
                columns,
                rows: Vec::new(),
            },
        );
        self.creations += 1;
        Ok(())
    }

    fn delete_where(&mut self, name: &str, predicate: &str) -> Result<()> {
        let table = self
            .tables
            .get_mut(name)
            .ok_or_else(|| anyhow!("Table {name} doesn't exist"))?;
        let expression = translate_predicate(predicate);
        let tree: Node = build_operator_tree(&expression)
            .map_err(|err| anyhow!("Syntax error in predicate '{predicate}': {err}"))?;
        if let Some(unknown) = tree
            .iter_variable_identifiers()
            .find(|ident| !table.has_column(ident))
        {
            bail!("Missing columns: '{unknown}' while processing query: '{predicate}'");
        }
        let mut retained = Vec::with_capacity(table.rows.len());
        for row in table.rows.drain(..) {
            let context = row_context(&table.columns, &row)?;
            let matched = matches!(tree.eval_with_context(&context), Ok(EvalValue::Boolean(true)));
            if !matched {
                retained.push(row);
            }
        }
        table.rows = retained;
        Ok(())
    }
}

impl DestinationStore for MemoryStore {
    fn database(&self) -> &str {
        &self.database
    }

    fn execute(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.statements.push(sql.to_string());
        if let Some(fragment) = self.rejections.iter().find(|f| sql.contains(f.as_str())) {
            bail!("Statement rejected by store (matched '{fragment}')");
        }

        if let Some(caps) = create_regex().captures(sql) {
            self.create_table(&caps[1], &caps[2])?;
            return Ok(Vec::new());
        }
        if let Some(caps) = delete_regex().captures(sql) {
            self.delete_where(&caps[1], caps[2].trim())?;
            return Ok(Vec::new());
        }
        if let Some(caps) = count_regex().captures(sql) {
            let count = self
                .tables
                .get(&caps[1])
                .map(|t| t.rows.len())
                .ok_or_else(|| anyhow!("Table {} doesn't exist", &caps[1]))?;
            return Ok(vec![vec![JsonValue::from(count as u64)]]);
        }
        bail!("Unsupported statement: {sql}")
    }

    fn exists(&mut self, table: &TableRef) -> Result<bool> {
        self.statements.push(format!("EXISTS {table}"));
        Ok(self.tables.contains_key(&table.to_string()))
    }

    fn bulk_insert(&mut self, table: &TableRef, rows: &[JsonRow]) -> Result<u64> {
        let entry = self
            .tables
            .get_mut(&table.to_string())
            .ok_or_else(|| anyhow!("Table {table} doesn't exist"))?;
        for (idx, row) in rows.iter().enumerate() {
            if let Some(unknown) = row.keys().find(|key| !entry.has_column(key)) {
                bail!("Row {idx}: no such column '{unknown}' in table {table}");
            }
        }
        entry.rows.extend(rows.iter().cloned());
        self.inserts += 1;
        Ok(rows.len() as u64)
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
    }
}

fn create_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^\s*CREATE TABLE IF NOT EXISTS\s+(\S+)\s*\(\n(.*)\n\)\s*ENGINE")
            .expect("valid create regex")
    })
}

fn delete_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^\s*ALTER TABLE\s+(\S+)\s+DELETE WHERE\s+(.+?);?\s*$")
            .expect("valid delete regex")
    })
}

fn count_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*SELECT\s+count\(\*?\)\s+FROM\s+([^\s;]+)\s*;?\s*$")
            .expect("valid count regex")
    })
}

/// Splits on `separator` only outside parentheses.
fn split_top_level<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    let bytes = text.as_bytes();
    let mut idx = 0usize;
    while idx < text.len() {
        match bytes[idx] {
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ => {}
        }
        if depth == 0 && bytes[idx..].starts_with(separator.as_bytes()) {
            parts.push(&text[start..idx]);
            idx += separator.len();
            start = idx;
            continue;
        }
        idx += 1;
    }
    parts.push(&text[start..]);
    parts
}

fn validate_type(ty: &str) -> Result<()> {
    if let Some(inner) = ty.strip_prefix("Array(").and_then(|t| t.strip_suffix(')')) {
        return validate_type(inner).with_context(|| format!("In '{ty}'"));
    }
    if let Some(inner) = ty.strip_prefix("Nested(").and_then(|t| t.strip_suffix(')')) {
        for member in split_top_level(inner, ",") {
            let (_, member_type) = member
                .trim()
                .split_once(' ')
                .ok_or_else(|| anyhow!("Malformed nested member '{member}'"))?;
            validate_type(member_type.trim()).with_context(|| format!("In '{ty}'"))?;
        }
        return Ok(());
    }
    if TYPE_FAMILIES.contains(&ty) {
        Ok(())
    } else {
        bail!("Unknown data type family: {ty}")
    }
}

fn translate_predicate(predicate: &str) -> String {
    static LITERAL: OnceLock<Regex> = OnceLock::new();
    static AND: OnceLock<Regex> = OnceLock::new();
    static OR: OnceLock<Regex> = OnceLock::new();
    static NOT: OnceLock<Regex> = OnceLock::new();
    static EQUALS: OnceLock<Regex> = OnceLock::new();

    let literal = LITERAL.get_or_init(|| Regex::new(r"'([^']*)'").expect("valid literal regex"));
    let and = AND.get_or_init(|| Regex::new(r"(?i)\bAND\b").expect("valid and regex"));
    let or = OR.get_or_init(|| Regex::new(r"(?i)\bOR\b").expect("valid or regex"));
    let not = NOT.get_or_init(|| Regex::new(r"(?i)\bNOT\b").expect("valid not regex"));
    let equals =
        EQUALS.get_or_init(|| Regex::new(r"([^<>!=])=([^=])").expect("valid equals regex"));

    let translated = literal.replace_all(predicate, "\"$1\"");
    let translated = and.replace_all(&translated, "&&");
    let translated = or.replace_all(&translated, "||");
    let translated = not.replace_all(&translated, "!");
    let translated = translated.replace("<>", "!=");
    equals.replace_all(&translated, "$1==$2").into_owned()
}

fn row_context(columns: &[(String, String)], row: &JsonRow) -> Result<HashMapContext> {
    let mut context: HashMapContext = HashMapContext::new();
    for (name, _) in columns {
        let value = match row.get(name) {
            Some(JsonValue::String(s)) => EvalValue::String(s.clone()),
            Some(JsonValue::Bool(b)) => EvalValue::Boolean(*b),
            Some(JsonValue::Number(n)) => match n.as_i64() {
                Some(i) => EvalValue::Int(i),
                None => EvalValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            _ => EvalValue::Empty,
        };
        context
            .set_value(name.clone(), value)
            .map_err(|err| anyhow!("Binding column '{name}': {err}"))?;
    }
    Ok(context)
}

//! Document-warehouse schemas and newline-delimited exports.
//!
//! A warehouse schema is a tree of field descriptors: each has a name, a
//! primitive type tag, and a mode. `RECORD`/`STRUCT` descriptors carry their
//! own child descriptors. The tree is owned, so it is acyclic by
//! construction.

use std::{
    fs,
    io::BufRead,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::io_utils;

pub type Document = JsonValue;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    #[default]
    Nullable,
    Required,
    Repeated,
}

impl Mode {
    pub fn is_repeated(&self) -> bool {
        matches!(self, Mode::Repeated)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<DocumentField>,
}

impl DocumentField {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            mode: Mode::Nullable,
            fields: Vec::new(),
        }
    }

    pub fn record(name: impl Into<String>, fields: Vec<DocumentField>) -> Self {
        Self {
            fields,
            ..Self::new(name, "RECORD")
        }
    }

    pub fn repeated(mut self) -> Self {
        self.mode = Mode::Repeated;
        self
    }

    pub fn is_record(&self) -> bool {
        self.field_type.eq_ignore_ascii_case("RECORD") || self.field_type.eq_ignore_ascii_case("STRUCT")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentSchema {
    pub fields: Vec<DocumentField>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaRepr {
    Fields(Vec<DocumentField>),
    Wrapped { fields: Vec<DocumentField> },
    Table { schema: Box<SchemaRepr> },
}

impl SchemaRepr {
    fn into_fields(self) -> Vec<DocumentField> {
        match self {
            SchemaRepr::Fields(fields) | SchemaRepr::Wrapped { fields } => fields,
            SchemaRepr::Table { schema } => schema.into_fields(),
        }
    }
}

impl DocumentSchema {
    pub fn new(fields: Vec<DocumentField>) -> Self {
        Self { fields }
    }

    /// Accepts a bare field array, `{"fields": [...]}`, or a table resource
    /// with a nested `schema` object.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let repr: SchemaRepr = serde_json::from_str(raw).context("Parsing document schema JSON")?;
        Ok(Self::new(repr.into_fields()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening document schema {path:?}"))?;
        Self::from_json_str(&raw).with_context(|| format!("Loading document schema {path:?}"))
    }
}

/// Reads a newline-delimited export into one document collection. Blank
/// lines are skipped; every other line must hold a JSON object.
pub fn read_exported_documents(path: &Path) -> Result<Vec<Document>> {
    let reader = io_utils::open_input(path)?;
    let mut documents = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Reading line {} of {path:?}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let document: Document = serde_json::from_str(trimmed)
            .with_context(|| format!("Parsing line {} of {path:?}", idx + 1))?;
        if !document.is_object() {
            bail!("Line {} of {path:?} is not a JSON object", idx + 1);
        }
        documents.push(document);
    }
    Ok(documents)
}

/// Source-warehouse collaborator: schema lookup plus export reading.
pub trait WarehouseClient {
    fn fetch_schema(&self, table_ref: &str) -> Result<DocumentSchema>;

    fn read_exported_documents(&self, path: &Path) -> Result<Vec<Document>> {
        read_exported_documents(path)
    }
}

/// Warehouse client backed by schema files exported next to the data,
/// named `<table_ref>.schema.json`.
#[derive(Debug, Clone)]
pub struct LocalExport {
    root: PathBuf,
}

impl LocalExport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn schema_path(&self, table_ref: &str) -> PathBuf {
        self.root.join(format!("{table_ref}.schema.json"))
    }
}

impl WarehouseClient for LocalExport {
    fn fetch_schema(&self, table_ref: &str) -> Result<DocumentSchema> {
        DocumentSchema::load(&self.schema_path(table_ref))
            .with_context(|| format!("Fetching schema for '{table_ref}'"))
    }
}

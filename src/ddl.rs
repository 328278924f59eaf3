//! Table definitions and `CREATE TABLE IF NOT EXISTS` synthesis.
//!
//! Field order is physical column order in the destination store, so it is
//! carried unchanged from the source schema into the statement text.

use std::collections::HashSet;

use itertools::Itertools;

use crate::{
    error::IngestError,
    types::{FieldDef, FieldType},
};

pub const STORAGE_ENGINE: &str = "MergeTree()";

/// Destination table definition, synthesized fresh for every load.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    name: String,
    fields: Vec<FieldDef>,
    sort_key: String,
    partition_key: Option<String>,
}

impl TableSpec {
    pub fn new(
        name: impl Into<String>,
        fields: Vec<FieldDef>,
        sort_key: impl Into<String>,
        partition_key: Option<String>,
    ) -> Result<Self, IngestError> {
        let name = name.into();
        let sort_key = sort_key.into();
        if name.trim().is_empty() {
            return Err(IngestError::invalid_schema(name, "table name is empty"));
        }
        if sort_key.trim().is_empty() {
            return Err(IngestError::invalid_schema(name, "sort key is empty"));
        }
        if partition_key.as_deref().is_some_and(|key| key.trim().is_empty()) {
            return Err(IngestError::invalid_schema(name, "partition key is empty"));
        }
        validate_fields(&fields, "").map_err(|detail| IngestError::invalid_schema(&name, detail))?;
        Ok(Self {
            name,
            fields,
            sort_key,
            partition_key,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn sort_key(&self) -> &str {
        &self.sort_key
    }

    pub fn partition_key(&self) -> Option<&str> {
        self.partition_key.as_deref()
    }

    /// A partition key replaces the requested sort key outright.
    pub fn effective_sort_key(&self) -> &str {
        self.partition_key.as_deref().unwrap_or(&self.sort_key)
    }
}

fn validate_fields(fields: &[FieldDef], parent: &str) -> Result<(), String> {
    if fields.is_empty() {
        return Err(if parent.is_empty() {
            "no fields to create".to_string()
        } else {
            format!("nested field '{parent}' has no children")
        });
    }
    let mut seen = HashSet::new();
    for field in fields {
        if field.name.trim().is_empty() {
            return Err(match parent {
                "" => "field name is empty".to_string(),
                _ => format!("field name under '{parent}' is empty"),
            });
        }
        if !seen.insert(field.name.as_str()) {
            return Err(format!("duplicate field name '{}'", qualified(parent, &field.name)));
        }
        validate_type(&field.field_type, &qualified(parent, &field.name))?;
    }
    Ok(())
}

fn validate_type(field_type: &FieldType, path: &str) -> Result<(), String> {
    match field_type {
        FieldType::Scalar(_) => Ok(()),
        FieldType::Nested(children) => validate_fields(children, path),
        FieldType::Array(inner) => match inner.as_ref() {
            FieldType::Array(_) => Err(format!("field '{path}' is an array of arrays")),
            other => validate_type(other, path),
        },
    }
}

fn qualified(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

pub fn render_type(field_type: &FieldType) -> String {
    match field_type {
        FieldType::Scalar(kind) => kind.type_name().to_string(),
        FieldType::Nested(fields) => {
            format!("Nested({})", fields.iter().map(render_field).join(","))
        }
        FieldType::Array(inner) => format!("Array({})", render_type(inner)),
    }
}

pub fn render_field(field: &FieldDef) -> String {
    format!("{} {}", field.name, render_type(&field.field_type))
}

pub fn render_fields(fields: &[FieldDef]) -> String {
    fields.iter().map(render_field).join(",\n")
}

pub fn generate(spec: &TableSpec, database: &str) -> String {
    let key = spec.effective_sort_key();
    let partition = spec
        .partition_key()
        .map(|key| format!("PARTITION BY {key}\n"))
        .unwrap_or_default();
    format!(
        "CREATE TABLE IF NOT EXISTS {database}.{name}\n(\n{fields}\n)\nENGINE = {STORAGE_ENGINE}\n{partition}ORDER BY {key};",
        name = spec.name(),
        fields = render_fields(spec.fields()),
    )
}

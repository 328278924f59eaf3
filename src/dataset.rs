//! In-memory tabular datasets: named, typed columns of equal length.
//!
//! Each column carries a native [`Dtype`] describing its element type. The
//! dtype drives both the DDL-time type mapping and the load-time coercion of
//! generic (`object`) columns to text.

use std::{collections::HashSet, convert::Infallible, fmt, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow, ensure};
use encoding_rs::Encoding;
use log::debug;

use crate::{
    io_utils,
    value::{Value, parse_boolean, parse_datetime_like},
};

pub const DEFAULT_DATETIME_DTYPE: &str = "datetime64[ns]";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dtype {
    Int64,
    Float64,
    Bool,
    /// Any datetime-like dtype; the full tag (unit, timezone) is kept.
    DateTime64(String),
    Object,
    Other(String),
}

impl Dtype {
    pub fn datetime() -> Self {
        Dtype::DateTime64(DEFAULT_DATETIME_DTYPE.to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Dtype::Int64 => "int64",
            Dtype::Float64 => "float64",
            Dtype::Bool => "bool",
            Dtype::DateTime64(tag) => tag,
            Dtype::Object => "object",
            Dtype::Other(tag) => tag,
        }
    }

    pub fn is_generic(&self) -> bool {
        matches!(self, Dtype::Object)
    }
}

impl FromStr for Dtype {
    type Err = Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let normalized = trimmed.to_ascii_lowercase();
        let dtype = match normalized.as_str() {
            "int64" => Dtype::Int64,
            "float64" => Dtype::Float64,
            "bool" => Dtype::Bool,
            "object" | "o" => Dtype::Object,
            other if other.starts_with("datetime64") || other.starts_with("<m8") => {
                Dtype::DateTime64(trimmed.to_string())
            }
            _ => Dtype::Other(trimmed.to_string()),
        };
        Ok(dtype)
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: Dtype,
    pub values: Vec<Option<Value>>,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: Dtype, values: Vec<Option<Value>>) -> Self {
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            ensure!(
                seen.insert(column.name.as_str()),
                "Duplicate column name '{}'",
                column.name
            );
        }
        if let Some(first) = columns.first() {
            for column in &columns {
                ensure!(
                    column.len() == first.len(),
                    "Column '{}' has {} value(s) but '{}' has {}",
                    column.name,
                    column.len(),
                    first.name,
                    first.len()
                );
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Ordered `(name, dtype)` pairs, one per column.
    pub fn dtypes(&self) -> Vec<(String, Dtype)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.dtype.clone()))
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<Option<&Value>>> + '_ {
        (0..self.row_count()).map(move |idx| {
            self.columns
                .iter()
                .map(|c| c.values.get(idx).and_then(Option::as_ref))
                .collect()
        })
    }

    /// Reads a headed CSV file and infers a dtype per column from the first
    /// `sample_rows` rows (0 scans everything).
    pub fn from_csv(
        path: &Path,
        delimiter: u8,
        encoding: &'static Encoding,
        sample_rows: usize,
    ) -> Result<Self> {
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, true)?;
        let headers = io_utils::reader_headers(&mut reader, encoding)
            .with_context(|| format!("Reading headers from {path:?}"))?;
        let mut raw_columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for (row_idx, record) in reader.byte_records().enumerate() {
            let record =
                record.with_context(|| format!("Reading row {} in {:?}", row_idx + 2, path))?;
            let decoded = io_utils::decode_record(&record, encoding)
                .with_context(|| format!("Decoding row {} in {:?}", row_idx + 2, path))?;
            for (idx, column) in raw_columns.iter_mut().enumerate() {
                column.push(decoded.get(idx).cloned().unwrap_or_default());
            }
        }

        let columns = headers
            .into_iter()
            .zip(raw_columns)
            .map(|(name, raw)| infer_column(name, raw, sample_rows))
            .collect::<Vec<_>>();
        Dataset::new(columns).with_context(|| format!("Building dataset from {path:?}"))
    }
}

#[derive(Debug, Clone)]
struct TypeCandidate {
    seen_value: bool,
    possible_boolean: bool,
    possible_integer: bool,
    possible_float: bool,
    possible_datetime: bool,
}

impl TypeCandidate {
    fn new() -> Self {
        Self {
            seen_value: false,
            possible_boolean: true,
            possible_integer: true,
            possible_float: true,
            possible_datetime: true,
        }
    }

    fn observe(&mut self, value: &str) {
        self.seen_value = true;
        if self.possible_boolean && parse_boolean(value).is_none() {
            self.possible_boolean = false;
        }
        if self.possible_integer && value.parse::<i64>().is_err() {
            self.possible_integer = false;
        }
        if self.possible_float && value.parse::<f64>().is_err() {
            self.possible_float = false;
        }
        if self.possible_datetime && parse_datetime_like(value).is_err() {
            self.possible_datetime = false;
        }
    }

    fn decide(&self) -> Dtype {
        if !self.seen_value {
            Dtype::Object
        } else if self.possible_boolean {
            Dtype::Bool
        } else if self.possible_integer {
            Dtype::Int64
        } else if self.possible_float {
            Dtype::Float64
        } else if self.possible_datetime {
            Dtype::datetime()
        } else {
            Dtype::Object
        }
    }
}

fn infer_column(name: String, raw: Vec<String>, sample_rows: usize) -> Column {
    let mut candidate = TypeCandidate::new();
    let limit = if sample_rows == 0 { raw.len() } else { sample_rows };
    for value in raw.iter().filter(|v| !v.is_empty()).take(limit) {
        candidate.observe(value);
    }
    let dtype = candidate.decide();
    match parse_column(&raw, &dtype) {
        Ok(values) => Column::new(name, dtype, values),
        Err(err) => {
            debug!("Column '{name}' falls back to object: {err}");
            let values = raw
                .into_iter()
                .map(|v| (!v.is_empty()).then_some(Value::String(v)))
                .collect();
            Column::new(name, Dtype::Object, values)
        }
    }
}

fn parse_column(raw: &[String], dtype: &Dtype) -> Result<Vec<Option<Value>>> {
    raw.iter()
        .map(|value| {
            if value.is_empty() {
                return Ok(None);
            }
            let parsed = match dtype {
                Dtype::Bool => parse_boolean(value)
                    .map(Value::Boolean)
                    .ok_or_else(|| anyhow!("'{value}' is not a boolean"))?,
                Dtype::Int64 => Value::Integer(
                    value
                        .parse()
                        .with_context(|| format!("'{value}' is not an integer"))?,
                ),
                Dtype::Float64 => Value::Float(
                    value
                        .parse()
                        .with_context(|| format!("'{value}' is not a float"))?,
                ),
                Dtype::DateTime64(_) => Value::DateTime(parse_datetime_like(value)?),
                Dtype::Object | Dtype::Other(_) => Value::String(value.clone()),
            };
            Ok(Some(parsed))
        })
        .collect()
}

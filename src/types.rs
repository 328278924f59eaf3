//! Destination column-type algebra and the two source-type mapping tables.
//!
//! Both mapping functions are total: every tabular dtype and every document
//! primitive tag maps to some [`ScalarKind`]. Unrecognised tabular dtypes
//! fall back to [`ScalarKind::String`]; unrecognised document tags map to
//! [`ScalarKind::Unknown`], which is rendered verbatim so the destination
//! store rejects the table instead of silently coercing the column.

use crate::dataset::Dtype;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Integer64,
    Float64,
    Boolean,
    String,
    DateTime,
    Date,
    Unknown,
}

impl ScalarKind {
    /// Type name understood by the destination store's DDL parser.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarKind::Integer64 => "Int64",
            ScalarKind::Float64 => "Float64",
            ScalarKind::Boolean => "UInt8",
            ScalarKind::String => "String",
            ScalarKind::DateTime => "DateTime",
            ScalarKind::Date => "Date",
            ScalarKind::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Scalar(ScalarKind),
    Nested(Vec<FieldDef>),
    Array(Box<FieldType>),
}

impl FieldType {
    pub fn array(inner: FieldType) -> Self {
        FieldType::Array(Box::new(inner))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, FieldType::Scalar(_))
    }

    /// True when an `Unknown` scalar appears anywhere inside this type.
    pub fn contains_unknown(&self) -> bool {
        match self {
            FieldType::Scalar(kind) => *kind == ScalarKind::Unknown,
            FieldType::Nested(fields) => fields.iter().any(|f| f.field_type.contains_unknown()),
            FieldType::Array(inner) => inner.contains_unknown(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    pub fn scalar(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self::new(name, FieldType::Scalar(kind))
    }
}

/// Tabular dtype -> scalar. Anything that is not one of the four typed
/// dtypes is stored as text.
pub fn map_dtype(dtype: &Dtype) -> ScalarKind {
    match dtype {
        Dtype::Int64 => ScalarKind::Integer64,
        Dtype::DateTime64(_) => ScalarKind::DateTime,
        Dtype::Bool => ScalarKind::Boolean,
        Dtype::Float64 => ScalarKind::Float64,
        Dtype::Object | Dtype::Other(_) => ScalarKind::String,
    }
}

/// Document primitive tag -> scalar. Tags are matched case-insensitively.
pub fn map_document_tag(tag: &str) -> ScalarKind {
    match tag.trim().to_ascii_uppercase().as_str() {
        "INTEGER" | "INT64" => ScalarKind::Integer64,
        "FLOAT" | "FLOAT64" => ScalarKind::Float64,
        "BOOLEAN" | "BOOL" => ScalarKind::Boolean,
        "STRING" => ScalarKind::String,
        "DATE" => ScalarKind::Date,
        "TIME" | "DATETIME" | "TIMESTAMP" => ScalarKind::DateTime,
        _ => ScalarKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtype_mapping_matches_table() {
        assert_eq!(map_dtype(&Dtype::Int64), ScalarKind::Integer64);
        assert_eq!(
            map_dtype(&"datetime64[ns]".parse::<Dtype>().unwrap()),
            ScalarKind::DateTime
        );
        assert_eq!(map_dtype(&Dtype::Bool), ScalarKind::Boolean);
        assert_eq!(map_dtype(&Dtype::Float64), ScalarKind::Float64);
        assert_eq!(map_dtype(&Dtype::Object), ScalarKind::String);
        assert_eq!(
            map_dtype(&Dtype::Other("category".into())),
            ScalarKind::String
        );
    }

    #[test]
    fn document_tags_map_with_unknown_fallback() {
        assert_eq!(map_document_tag("INTEGER"), ScalarKind::Integer64);
        assert_eq!(map_document_tag("FLOAT"), ScalarKind::Float64);
        assert_eq!(map_document_tag("BOOLEAN"), ScalarKind::Boolean);
        assert_eq!(map_document_tag("STRING"), ScalarKind::String);
        assert_eq!(map_document_tag("DATE"), ScalarKind::Date);
        for tag in ["TIME", "DATETIME", "TIMESTAMP"] {
            assert_eq!(map_document_tag(tag), ScalarKind::DateTime);
        }
        assert_eq!(map_document_tag("timestamp"), ScalarKind::DateTime);
        assert_eq!(map_document_tag("GEOGRAPHY"), ScalarKind::Unknown);
        assert_eq!(map_document_tag(""), ScalarKind::Unknown);
    }

    #[test]
    fn contains_unknown_looks_through_nesting() {
        let nested = FieldType::array(FieldType::Nested(vec![
            FieldDef::scalar("sku", ScalarKind::String),
            FieldDef::scalar("shape", ScalarKind::Unknown),
        ]));
        assert!(nested.contains_unknown());
        assert!(!FieldType::Scalar(ScalarKind::Date).contains_unknown());
    }
}

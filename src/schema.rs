//! Source schema → ordered destination field definitions.

use log::warn;

use crate::{
    dataset::{Dataset, Dtype},
    document::{DocumentField, DocumentSchema},
    types::{FieldDef, FieldType, ScalarKind, map_document_tag, map_dtype},
};

#[derive(Debug, Clone, PartialEq)]
pub enum SourceSchema {
    /// `(column name, native dtype)` pairs in column order.
    Tabular(Vec<(String, Dtype)>),
    /// Nested/repeated field descriptors from the document warehouse.
    DocumentTree(DocumentSchema),
}

impl From<&Dataset> for SourceSchema {
    fn from(dataset: &Dataset) -> Self {
        SourceSchema::Tabular(dataset.dtypes())
    }
}

impl From<DocumentSchema> for SourceSchema {
    fn from(schema: DocumentSchema) -> Self {
        SourceSchema::DocumentTree(schema)
    }
}

impl SourceSchema {
    pub fn field_count(&self) -> usize {
        match self {
            SourceSchema::Tabular(columns) => columns.len(),
            SourceSchema::DocumentTree(schema) => schema.fields.len(),
        }
    }
}

/// Builds one field definition per top-level source column/field, in source
/// order. Fallback mappings are reported at warning level.
pub fn build(schema: &SourceSchema) -> Vec<FieldDef> {
    match schema {
        SourceSchema::Tabular(columns) => columns
            .iter()
            .map(|(name, dtype)| tabular_field(name, dtype))
            .collect(),
        SourceSchema::DocumentTree(tree) => build_document_fields(&tree.fields, ""),
    }
}

fn tabular_field(name: &str, dtype: &Dtype) -> FieldDef {
    if let Dtype::Other(tag) = dtype {
        warn!("Column '{name}' has unrecognised dtype '{tag}'; mapping it to String");
    }
    FieldDef::scalar(name, map_dtype(dtype))
}

fn build_document_fields(fields: &[DocumentField], parent: &str) -> Vec<FieldDef> {
    fields
        .iter()
        .map(|field| build_document_field(field, parent))
        .collect()
}

fn build_document_field(field: &DocumentField, parent: &str) -> FieldDef {
    let path = if parent.is_empty() {
        field.name.clone()
    } else {
        format!("{parent}.{}", field.name)
    };
    let base = if field.is_record() {
        FieldType::Nested(build_document_fields(&field.fields, &path))
    } else {
        let kind = map_document_tag(&field.field_type);
        if kind == ScalarKind::Unknown {
            warn!(
                "Field '{path}' has unrecognised type '{}'; it will be declared as Unknown",
                field.field_type
            );
        }
        FieldType::Scalar(kind)
    };
    let field_type = if field.mode.is_repeated() {
        FieldType::array(base)
    } else {
        base
    };
    FieldDef::new(field.name.clone(), field_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabular_schema_builds_flat_fields_in_order() {
        let schema = SourceSchema::Tabular(vec![
            ("id".into(), Dtype::Int64),
            ("created".into(), Dtype::datetime()),
            ("active".into(), Dtype::Bool),
            ("name".into(), Dtype::Object),
            ("ratio".into(), Dtype::Other("float32".into())),
        ]);
        let fields = build(&schema);
        let names = fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["id", "created", "active", "name", "ratio"]);
        assert!(fields.iter().all(|f| f.field_type.is_scalar()));
        assert_eq!(
            fields[4].field_type,
            FieldType::Scalar(ScalarKind::String)
        );
    }

    #[test]
    fn repeated_record_becomes_array_of_nested() {
        let schema = SourceSchema::DocumentTree(DocumentSchema::new(vec![
            DocumentField::record(
                "items",
                vec![
                    DocumentField::new("sku", "STRING"),
                    DocumentField::new("qty", "INTEGER"),
                ],
            )
            .repeated(),
        ]));
        let fields = build(&schema);
        assert_eq!(
            fields,
            vec![FieldDef::new(
                "items",
                FieldType::array(FieldType::Nested(vec![
                    FieldDef::scalar("sku", ScalarKind::String),
                    FieldDef::scalar("qty", ScalarKind::Integer64),
                ]))
            )]
        );
    }

    #[test]
    fn repeated_scalar_and_deep_records() {
        let schema = SourceSchema::DocumentTree(DocumentSchema::new(vec![
            DocumentField::new("tags", "STRING").repeated(),
            DocumentField::record(
                "device",
                vec![DocumentField::record(
                    "geo",
                    vec![DocumentField::new("city", "STRING")],
                )],
            ),
        ]));
        let fields = build(&schema);
        assert_eq!(
            fields[0].field_type,
            FieldType::array(FieldType::Scalar(ScalarKind::String))
        );
        let FieldType::Nested(device) = &fields[1].field_type else {
            panic!("device should be nested");
        };
        let FieldType::Nested(geo) = &device[0].field_type else {
            panic!("geo should be nested");
        };
        assert_eq!(geo[0], FieldDef::scalar("city", ScalarKind::String));
    }

    #[test]
    fn unknown_document_tags_are_kept() {
        let schema = SourceSchema::DocumentTree(DocumentSchema::new(vec![DocumentField::new(
            "area", "GEOGRAPHY",
        )]));
        let fields = build(&schema);
        assert_eq!(fields[0].field_type, FieldType::Scalar(ScalarKind::Unknown));
    }
}

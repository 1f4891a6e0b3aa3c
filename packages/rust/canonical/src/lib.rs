//! Canonical serialization of normalized tag documents.
//!
//! A [`Document`] becomes key-sorted TOML text. Keys are ordered at every
//! nesting level and [`FieldValue::Absent`] fields are dropped wherever they
//! appear, so two documents with the same field→value set always produce the
//! same bytes.

use tagtree_shared::{Document, FieldValue, Result, TagtreeError};
use toml::{Table, Value};

/// File extension for canonical documents.
pub const EXTENSION: &str = "toml";

/// Serialize a document to canonical bytes.
pub fn serialize(doc: &Document) -> Result<Vec<u8>> {
    let table = to_toml_table(doc);
    let text = toml::to_string(&table).map_err(|e| TagtreeError::Serialize(e.to_string()))?;
    Ok(text.into_bytes())
}

/// Convert a document to a TOML table, dropping absent fields.
///
/// Fields are inserted in lexicographic key order regardless of how the
/// underlying map orders them.
pub fn to_toml_table(doc: &Document) -> Table {
    let mut present: Vec<(&str, Value)> = doc
        .iter()
        .filter_map(|(key, value)| to_toml_value(value).map(|v| (key, v)))
        .collect();
    present.sort_by(|a, b| a.0.cmp(b.0));

    let mut table = Table::new();
    for (key, value) in present {
        table.insert(key.to_string(), value);
    }
    table
}

fn to_toml_value(value: &FieldValue) -> Option<Value> {
    match value {
        FieldValue::Absent => None,
        FieldValue::Text(s) => Some(Value::String(s.clone())),
        FieldValue::Integer(i) => Some(Value::Integer(*i)),
        FieldValue::Float(f) => Some(Value::Float(*f)),
        FieldValue::Boolean(b) => Some(Value::Boolean(*b)),
        FieldValue::List(items) => Some(Value::Array(
            items.iter().filter_map(to_toml_value).collect(),
        )),
        FieldValue::Table(doc) => Some(Value::Table(to_toml_table(doc))),
    }
}

//! Core domain types for tagtree imports.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TagtreeError};

// ---------------------------------------------------------------------------
// FieldValue / Document
// ---------------------------------------------------------------------------

/// A single value in a normalized document.
///
/// [`FieldValue::Absent`] marks a field that intentionally has no value. It is
/// distinct from an empty string and never reaches serialized output.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Absent,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<FieldValue>),
    Table(Document),
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// `Absent` for blank (empty or whitespace-only) text, `Text` otherwise.
    pub fn text_or_absent(value: &str) -> Self {
        if value.trim().is_empty() {
            Self::Absent
        } else {
            Self::Text(value.to_string())
        }
    }

    /// Convert a decoded JSON value. `null` becomes `Absent`.
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Absent,
            Value::Bool(b) => Self::Boolean(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else if let (true, Some(f)) = (n.is_f64(), n.as_f64()) {
                    Self::Float(f)
                } else {
                    // beyond i64, which TOML integers cannot hold
                    Self::Text(n.to_string())
                }
            }
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Table(Document::from_json_object(map)),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A canonical, source-independent tag document.
///
/// Keys live in a `BTreeMap`, so insertion order never leaks into output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: BTreeMap<String, FieldValue>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a JSON object, converting every field.
    pub fn from_json_object(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter()
            .map(|(k, v)| (k, FieldValue::from_json(v)))
            .collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Text value of `key`, if present and textual.
    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Mark `key` as absent. The field is dropped at serialization time.
    pub fn clear(&mut self, key: &str) {
        if let Some(value) = self.fields.get_mut(key) {
            *value = FieldValue::Absent;
        }
    }

    /// Iterate fields in key order, including absent ones.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields carrying a value.
    pub fn present_len(&self) -> usize {
        self.fields.values().filter(|v| !v.is_absent()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Document> for FieldValue {
    fn from(doc: Document) -> Self {
        Self::Table(doc)
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// TreePath
// ---------------------------------------------------------------------------

/// A relative, slash-separated output path one or two segments deep.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreePath {
    segments: Vec<String>,
}

impl TreePath {
    /// `{name}.{ext}` at the tree root.
    pub fn file(name: &str, ext: &str) -> Result<Self> {
        Ok(Self {
            segments: vec![check_segment(&format!("{name}.{ext}"))?],
        })
    }

    /// `{dir}/{name}.{ext}`.
    pub fn nested(dir: &str, name: &str, ext: &str) -> Result<Self> {
        Ok(Self {
            segments: vec![check_segment(dir)?, check_segment(&format!("{name}.{ext}"))?],
        })
    }

    /// Path segments, directory first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The final segment.
    pub fn file_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl FromStr for TreePath {
    type Err = TagtreeError;

    fn from_str(s: &str) -> Result<Self> {
        let segments = s
            .split('/')
            .map(check_segment)
            .collect::<Result<Vec<_>>>()?;
        if segments.len() > 2 {
            return Err(TagtreeError::validation(format!(
                "tree path '{s}' is deeper than two segments"
            )));
        }
        Ok(Self { segments })
    }
}

/// Longest accepted segment, in bytes. Leaves room under the usual
/// 255-byte file name limit.
pub const MAX_SEGMENT_BYTES: usize = 250;

fn check_segment(segment: &str) -> Result<String> {
    if segment.len() > MAX_SEGMENT_BYTES {
        return Err(TagtreeError::validation(format!(
            "path segment is longer than {MAX_SEGMENT_BYTES} bytes ({})",
            segment.len()
        )));
    }
    let bad = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.starts_with('.')
        || segment.contains(['/', '\\', '\0']);
    if bad {
        return Err(TagtreeError::validation(format!(
            "invalid path segment '{segment}'"
        )));
    }
    Ok(segment.to_string())
}

// ---------------------------------------------------------------------------
// ImportEntry / SkippedRecord
// ---------------------------------------------------------------------------

/// One normalized document and where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportEntry {
    pub path: TreePath,
    pub document: Document,
}

/// A record dropped by an adapter's inclusion policy. Not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Identifies the record (handle, key, or CSV row number).
    pub record: String,
    /// Why it was dropped.
    pub reason: String,
    /// Deliberate exclusions are logged at debug level instead of warn.
    pub silent: bool,
}

impl SkippedRecord {
    pub fn warn(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            reason: reason.into(),
            silent: false,
        }
    }

    pub fn silent(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            reason: reason.into(),
            silent: true,
        }
    }
}

// ---------------------------------------------------------------------------
// SourceType / ImportMode
// ---------------------------------------------------------------------------

/// The closed set of supported sources, named explicitly by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    HandlePrefixed,
    FlatKeyed,
    CsvCategorized,
}

impl SourceType {
    pub const ALL: [SourceType; 3] = [Self::HandlePrefixed, Self::FlatKeyed, Self::CsvCategorized];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::HandlePrefixed => "handle-prefixed",
            Self::FlatKeyed => "flat-keyed",
            Self::CsvCategorized => "csv-categorized",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = TagtreeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TagtreeError::UnsupportedSourceType(s.to_string()))
    }
}

/// How a run treats existing tree state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportMode {
    /// Build a fresh tree from the source alone.
    #[default]
    Replace,
    /// Merge into existing tree state. Always rejected.
    Append,
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => f.write_str("replace"),
            Self::Append => f.write_str("append"),
        }
    }
}

// ---------------------------------------------------------------------------
// ContentId
// ---------------------------------------------------------------------------

/// Lowercase hex SHA-256 identifier of a finalized tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn from_digest(digest: &[u8]) -> Self {
        Self(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

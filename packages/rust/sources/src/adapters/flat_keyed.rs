//! Flat-keyed JSON blob adapter.

use serde_json::Value;

use tagtree_canonical::EXTENSION;
use tagtree_shared::{
    Document, FlatKeyedConfig, ImportEntry, Result, SkippedRecord, TagtreeError, TreePath,
};

use super::{Mapped, SourceAdapter};

/// Maps `{key: record}` objects to `{key}.toml` documents.
#[derive(Debug, Clone)]
pub struct FlatKeyedAdapter {
    config: FlatKeyedConfig,
}

impl FlatKeyedAdapter {
    pub fn new(config: FlatKeyedConfig) -> Self {
        Self { config }
    }

    pub fn default_location(&self) -> &str {
        &self.config.url
    }

    /// Split the payload into `(key, record)` pairs.
    pub fn records(&self, payload: Value) -> Result<Vec<(String, Value)>> {
        match payload {
            Value::Object(map) => Ok(map.into_iter().collect()),
            _ => Err(TagtreeError::decode("tag blob is not a JSON object")),
        }
    }
}

impl SourceAdapter for FlatKeyedAdapter {
    type Record = (String, Value);

    fn name(&self) -> &str {
        "flat-keyed"
    }

    fn map_record(&self, (key, record): (String, Value)) -> Mapped {
        let Value::Object(map) = record else {
            return Mapped::Skip(SkippedRecord::warn(key, "record is not a JSON object"));
        };

        let path = match TreePath::file(&key, EXTENSION) {
            Ok(path) => path,
            Err(e) => return Mapped::Skip(SkippedRecord::warn(key, e.to_string())),
        };

        let mut document = Document::from_json_object(map);
        document.clear(&self.config.id_field);

        Mapped::Keep(ImportEntry { path, document })
    }
}

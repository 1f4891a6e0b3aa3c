//! Handle-prefixed tag API adapter.
//!
//! Records carry a handle like `tech.cloud`. The part before the first `.`
//! picks the directory, the rest names the file: `tech/cloud.toml`.

use serde_json::Value;

use tagtree_canonical::EXTENSION;
use tagtree_shared::{
    Document, HandlePrefixedConfig, ImportEntry, Result, SkippedRecord, TagtreeError, TreePath,
};

use super::{Mapped, SourceAdapter};

/// Maps tag API records by their prefixed handle.
#[derive(Debug, Clone)]
pub struct HandlePrefixedAdapter {
    config: HandlePrefixedConfig,
}

impl HandlePrefixedAdapter {
    pub fn new(config: HandlePrefixedConfig) -> Self {
        Self { config }
    }

    pub fn default_location(&self) -> &str {
        &self.config.url
    }

    /// Pull the record list out of an API response.
    ///
    /// Accepts a bare array or an object wrapping the array under `data`.
    pub fn records(&self, payload: Value) -> Result<Vec<Value>> {
        match payload {
            Value::Array(items) => Ok(items),
            Value::Object(mut map) => match map.remove("data") {
                Some(Value::Array(items)) => Ok(items),
                _ => Err(TagtreeError::decode("tag API response has no `data` array")),
            },
            _ => Err(TagtreeError::decode("tag API response is neither an array nor an object")),
        }
    }

    fn is_excluded(&self, prefix: &str) -> bool {
        self.config.excluded_prefixes.iter().any(|p| p == prefix)
    }

    fn is_accepted(&self, prefix: &str) -> bool {
        self.config.accepted_prefixes.iter().any(|p| p == prefix)
    }
}

impl SourceAdapter for HandlePrefixedAdapter {
    type Record = Value;

    fn name(&self) -> &str {
        "handle-prefixed"
    }

    fn map_record(&self, record: Value) -> Mapped {
        let field = &self.config.handle_field;

        let Value::Object(map) = record else {
            return Mapped::Skip(SkippedRecord::warn("<non-object>", "record is not a JSON object"));
        };

        let handle = match map.get(field) {
            Some(Value::String(h)) => h.clone(),
            _ => {
                return Mapped::Skip(SkippedRecord::warn(
                    "<no handle>",
                    format!("missing or non-string `{field}` field"),
                ));
            }
        };

        let Some((prefix, tag)) = handle.split_once('.') else {
            return Mapped::Skip(SkippedRecord::warn(&handle, "handle has no prefix"));
        };

        if self.is_excluded(prefix) {
            return Mapped::Skip(SkippedRecord::silent(
                &handle,
                format!("`{prefix}` records are excluded"),
            ));
        }
        if !self.is_accepted(prefix) {
            return Mapped::Skip(SkippedRecord::warn(
                &handle,
                format!("prefix `{prefix}` is not accepted"),
            ));
        }

        let path = match TreePath::nested(prefix, tag, EXTENSION) {
            Ok(path) => path,
            Err(e) => return Mapped::Skip(SkippedRecord::warn(&handle, e.to_string())),
        };

        let mut document = Document::from_json_object(map);
        document.clear(field);

        Mapped::Keep(ImportEntry { path, document })
    }
}

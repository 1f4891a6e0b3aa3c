//! CSV export adapter with a category hierarchy.
//!
//! Column headers become field names (`"Priority (1-5)"` → `priority`), the
//! `category` column picks the directory (`"Health Care(s)"` →
//! `health-cares`) and `canonical_name` names the file.

use std::sync::LazyLock;

use regex::Regex;

use tagtree_canonical::EXTENSION;
use tagtree_shared::{
    CsvCategorizedConfig, Document, FieldValue, ImportEntry, SkippedRecord, TreePath,
};

use super::{Mapped, SourceAdapter};
use crate::csv_stream::CsvRow;

const CATEGORY_FIELD: &str = "category";
const CANONICAL_NAME_FIELD: &str = "canonical_name";

/// Fields that become absent rather than empty strings when blank.
const OPTIONAL_FIELDS: [&str; 3] = ["parent", "subcategory", "caption"];

/// Normalize a raw column header to a canonical field name.
///
/// Strips a trailing parenthetical, collapses whitespace runs to `_` and
/// lowercases.
pub fn normalize_header(header: &str) -> String {
    static TRAILING_PAREN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s*\([^()]*\)\s*$").expect("valid regex"));
    static WHITESPACE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    let stripped = TRAILING_PAREN_RE.replace(header, "");
    WHITESPACE_RE
        .replace_all(stripped.trim(), "_")
        .to_lowercase()
}

/// Normalize a category value to a directory name.
///
/// Whitespace runs become `-`, a trailing `(s)` becomes `s`, then lowercase.
pub fn normalize_category(category: &str) -> String {
    static WHITESPACE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    let hyphenated = WHITESPACE_RE.replace_all(category.trim(), "-");
    let plural = match hyphenated.strip_suffix("(s)") {
        Some(stem) => format!("{stem}s"),
        None => hyphenated.into_owned(),
    };
    plural.to_lowercase()
}

/// Maps CSV rows into `{category}/{canonical_name}.toml` documents.
#[derive(Debug, Clone)]
pub struct CsvCategorizedAdapter {
    config: CsvCategorizedConfig,
}

impl CsvCategorizedAdapter {
    pub fn new(config: CsvCategorizedConfig) -> Self {
        Self { config }
    }

    pub fn default_location(&self) -> &str {
        &self.config.url
    }
}

impl SourceAdapter for CsvCategorizedAdapter {
    type Record = CsvRow;

    fn name(&self) -> &str {
        "csv-categorized"
    }

    fn map_record(&self, row: CsvRow) -> Mapped {
        let record_id = format!("row {}", row.line);

        let mut document = Document::new();
        for (header, value) in row.fields {
            let field = normalize_header(&header);
            if field.is_empty() {
                continue;
            }
            let value = if OPTIONAL_FIELDS.contains(&field.as_str()) {
                FieldValue::text_or_absent(&value)
            } else {
                FieldValue::Text(value)
            };
            document.insert(field, value);
        }

        let name = match document.get_text(CANONICAL_NAME_FIELD).map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Mapped::Skip(SkippedRecord::warn(record_id, "blank canonical name"));
            }
        };

        let category = document
            .get_text(CATEGORY_FIELD)
            .map(normalize_category)
            .filter(|c| !c.is_empty());

        let path = match &category {
            Some(dir) => TreePath::nested(dir, &name, EXTENSION),
            None => TreePath::file(&name, EXTENSION),
        };
        let path = match path {
            Ok(path) => path,
            Err(e) => return Mapped::Skip(SkippedRecord::warn(record_id, e.to_string())),
        };

        document.clear(CATEGORY_FIELD);
        document.clear(CANONICAL_NAME_FIELD);

        Mapped::Keep(ImportEntry { path, document })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> CsvRow {
        CsvRow {
            line: 2,
            fields: pairs
                .iter()
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn adapter() -> CsvCategorizedAdapter {
        CsvCategorizedAdapter::new(CsvCategorizedConfig::default())
    }

    #[test]
    fn header_normalization() {
        assert_eq!(normalize_header("Priority (1-5)"), "priority");
        assert_eq!(normalize_header("Canonical Name"), "canonical_name");
        assert_eq!(normalize_header("  Sub   Category  "), "sub_category");
        assert_eq!(normalize_header("Caption"), "caption");
        assert_eq!(normalize_header("Notes (internal) "), "notes");
    }

    #[test]
    fn category_normalization() {
        assert_eq!(normalize_category("Health Care(s)"), "health-cares");
        assert_eq!(normalize_category("Civic  Tech"), "civic-tech");
        assert_eq!(normalize_category("Education"), "education");
        assert_eq!(normalize_category(" "), "");
    }

    #[test]
    fn row_maps_to_category_path() {
        let Mapped::Keep(entry) = adapter().map_record(row(&[
            ("Category", "Health Care(s)"),
            ("Canonical Name", "clinics"),
            ("Priority (1-5)", "3"),
            ("Parent", ""),
            ("Subcategory", "  "),
            ("Caption", ""),
        ])) else {
            panic!("expected keep");
        };

        assert_eq!(entry.path.to_string(), "health-cares/clinics.toml");
        assert_eq!(entry.document.get_text("priority"), Some("3"));
        assert!(entry.document.get("category").unwrap().is_absent());
        assert!(entry.document.get("canonical_name").unwrap().is_absent());

        let text = String::from_utf8(tagtree_canonical::serialize(&entry.document).unwrap()).unwrap();
        assert_eq!(text, "priority = \"3\"\n");
    }

    #[test]
    fn filled_optional_fields_are_kept() {
        let Mapped::Keep(entry) = adapter().map_record(row(&[
            ("Category", "Tech"),
            ("Canonical Name", "cloud"),
            ("Parent", "computing"),
            ("Caption", "Cloud things"),
        ])) else {
            panic!("expected keep");
        };
        assert_eq!(entry.document.get_text("parent"), Some("computing"));
        assert_eq!(entry.document.get_text("caption"), Some("Cloud things"));
    }

    #[test]
    fn blank_non_optional_field_stays_empty_string() {
        let Mapped::Keep(entry) = adapter().map_record(row(&[
            ("Category", "Tech"),
            ("Canonical Name", "cloud"),
            ("Description", ""),
        ])) else {
            panic!("expected keep");
        };
        assert_eq!(entry.document.get_text("description"), Some(""));
    }

    #[test]
    fn blank_category_lands_at_root() {
        let Mapped::Keep(entry) = adapter().map_record(row(&[
            ("Category", ""),
            ("Canonical Name", "misc"),
        ])) else {
            panic!("expected keep");
        };
        assert_eq!(entry.path.to_string(), "misc.toml");
    }

    #[test]
    fn blank_canonical_name_is_skipped() {
        let mapped = adapter().map_record(row(&[("Category", "Tech"), ("Canonical Name", " ")]));
        assert!(matches!(mapped, Mapped::Skip(ref s) if s.record == "row 2" && !s.silent));
    }
}

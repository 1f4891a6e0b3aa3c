//! Source adapter trait and the closed set of built-in adapters.
//!
//! Each adapter turns one source's raw records into [`ImportEntry`] values,
//! deriving the tree path from the record's own classification fields. The
//! caller always names the source type; adapters never guess it from data.

mod csv_categorized;
mod flat_keyed;
mod handle_prefixed;

use tracing::{debug, info, instrument, warn};

use tagtree_shared::{ImportEntry, Result, SkippedRecord, SourceType, SourcesConfig};

use crate::csv_stream;
use crate::fetch::Fetcher;

pub use csv_categorized::{CsvCategorizedAdapter, normalize_category, normalize_header};
pub use flat_keyed::FlatKeyedAdapter;
pub use handle_prefixed::HandlePrefixedAdapter;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Outcome of mapping one raw record.
#[derive(Debug, Clone, PartialEq)]
pub enum Mapped {
    Keep(ImportEntry),
    Skip(SkippedRecord),
}

/// Maps one source's raw records to path-addressed documents.
pub trait SourceAdapter {
    /// The raw record shape this source yields.
    type Record;

    /// Human-readable adapter name for tracing.
    fn name(&self) -> &str;

    /// Normalize one record, or say why it is dropped.
    fn map_record(&self, record: Self::Record) -> Mapped;
}

/// Everything one adapter produced from one payload.
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    /// Kept entries, in source order.
    pub entries: Vec<ImportEntry>,
    /// Dropped records, in source order.
    pub skipped: Vec<SkippedRecord>,
}

/// Map every record in order, logging each skip.
pub(crate) fn map_all<A: SourceAdapter>(
    adapter: &A,
    records: impl IntoIterator<Item = A::Record>,
) -> ImportBatch {
    let mut batch = ImportBatch::default();

    for record in records {
        match adapter.map_record(record) {
            Mapped::Keep(entry) => {
                debug!(path = %entry.path, "record mapped");
                batch.entries.push(entry);
            }
            Mapped::Skip(skip) => {
                if skip.silent {
                    debug!(record = %skip.record, reason = %skip.reason, "record excluded");
                } else {
                    warn!(record = %skip.record, reason = %skip.reason, "skipping record");
                }
                batch.skipped.push(skip);
            }
        }
    }

    batch
}

// ---------------------------------------------------------------------------
// Closed dispatch
// ---------------------------------------------------------------------------

/// One of the built-in adapters, selected by [`SourceType`].
#[derive(Debug, Clone)]
pub enum Adapter {
    HandlePrefixed(HandlePrefixedAdapter),
    FlatKeyed(FlatKeyedAdapter),
    CsvCategorized(CsvCategorizedAdapter),
}

impl Adapter {
    /// Build the adapter for `source`, owning a copy of its config section.
    pub fn new(source: SourceType, config: &SourcesConfig) -> Self {
        match source {
            SourceType::HandlePrefixed => {
                Self::HandlePrefixed(HandlePrefixedAdapter::new(config.handle_prefixed.clone()))
            }
            SourceType::FlatKeyed => Self::FlatKeyed(FlatKeyedAdapter::new(config.flat_keyed.clone())),
            SourceType::CsvCategorized => {
                Self::CsvCategorized(CsvCategorizedAdapter::new(config.csv_categorized.clone()))
            }
        }
    }

    pub fn source_type(&self) -> SourceType {
        match self {
            Self::HandlePrefixed(_) => SourceType::HandlePrefixed,
            Self::FlatKeyed(_) => SourceType::FlatKeyed,
            Self::CsvCategorized(_) => SourceType::CsvCategorized,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::HandlePrefixed(a) => a.name(),
            Self::FlatKeyed(a) => a.name(),
            Self::CsvCategorized(a) => a.name(),
        }
    }

    /// Location used when the caller gives no override.
    pub fn default_location(&self) -> &str {
        match self {
            Self::HandlePrefixed(a) => a.default_location(),
            Self::FlatKeyed(a) => a.default_location(),
            Self::CsvCategorized(a) => a.default_location(),
        }
    }

    /// Fetch the source payload and map all of its records.
    ///
    /// Fetch and decode failures are returned as errors; dropped records are
    /// reported in [`ImportBatch::skipped`].
    #[instrument(skip_all, fields(adapter = self.name()))]
    pub async fn import(&self, fetcher: &Fetcher, location: Option<&str>) -> Result<ImportBatch> {
        let location = location.unwrap_or_else(|| self.default_location());
        info!(location, "importing source");

        let batch = match self {
            Self::HandlePrefixed(a) => {
                let payload = fetcher.fetch_json(location).await?;
                map_all(a, a.records(payload)?)
            }
            Self::FlatKeyed(a) => {
                let payload = fetcher.fetch_json(location).await?;
                map_all(a, a.records(payload)?)
            }
            Self::CsvCategorized(a) => {
                let bytes = fetcher.fetch_bytes(location).await?;
                // All rows must be in hand before any path is derived.
                let rows = csv_stream::collect_rows(csv_stream::spawn_rows(bytes)).await?;
                map_all(a, rows)
            }
        };

        info!(
            kept = batch.entries.len(),
            skipped = batch.skipped.len(),
            "source mapped"
        );
        Ok(batch)
    }
}

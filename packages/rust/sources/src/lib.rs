//! Source adapters and their fetch/decode collaborators.
//!
//! This crate provides:
//! - [`fetch`]: HTTP / local-file payload fetching
//! - [`csv_stream`]: push-based CSV row decoding
//! - [`adapters`]: the three source adapters and their path rules
//! - [`Adapter`]: closed dispatch over the adapters by [`tagtree_shared::SourceType`]

pub mod adapters;
pub mod csv_stream;
pub mod fetch;

pub use adapters::{
    Adapter, CsvCategorizedAdapter, FlatKeyedAdapter, HandlePrefixedAdapter, ImportBatch, Mapped,
    SourceAdapter,
};
pub use csv_stream::{CsvRow, RowStream, collect_rows, spawn_rows};
pub use fetch::{FetchOptions, Fetcher};

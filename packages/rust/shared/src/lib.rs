//! Shared types, error model, and configuration for tagtree.
//!
//! This crate is the foundation depended on by all other tagtree crates.
//! It provides:
//! - [`TagtreeError`]: the unified error type
//! - Domain types ([`Document`], [`FieldValue`], [`TreePath`], [`SourceType`], [`ContentId`])
//! - Configuration ([`AppConfig`], per-source config sections, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CollisionPolicy, CsvCategorizedConfig, FlatKeyedConfig, HandlePrefixedConfig,
    OutputConfig, SourcesConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{Result, TagtreeError};
pub use types::{
    ContentId, Document, FieldValue, ImportEntry, ImportMode, MAX_SEGMENT_BYTES, SkippedRecord,
    SourceType, TreePath,
};

//! Application configuration for tagtree.
//!
//! User config lives at `~/.tagtree/tagtree.toml`.
//! CLI flags override config file values, which override defaults.
//!
//! Each source adapter owns its own section, so tests can build an adapter
//! with a different default location or prefix table without touching
//! anything global.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TagtreeError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "tagtree.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".tagtree";

// ---------------------------------------------------------------------------
// Config structs (matching tagtree.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Per-source adapter settings.
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[sources]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub handle_prefixed: HandlePrefixedConfig,

    #[serde(default)]
    pub flat_keyed: FlatKeyedConfig,

    #[serde(default)]
    pub csv_categorized: CsvCategorizedConfig,
}

/// `[sources.handle_prefixed]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlePrefixedConfig {
    /// Default location of the tag API.
    #[serde(default = "default_handle_prefixed_url")]
    pub url: String,

    /// Record field holding the prefixed handle.
    #[serde(default = "default_handle_field")]
    pub handle_field: String,

    /// Prefixes that produce documents.
    #[serde(default = "default_accepted_prefixes")]
    pub accepted_prefixes: Vec<String>,

    /// Prefixes dropped without a warning.
    #[serde(default = "default_excluded_prefixes")]
    pub excluded_prefixes: Vec<String>,
}

impl Default for HandlePrefixedConfig {
    fn default() -> Self {
        Self {
            url: default_handle_prefixed_url(),
            handle_field: default_handle_field(),
            accepted_prefixes: default_accepted_prefixes(),
            excluded_prefixes: default_excluded_prefixes(),
        }
    }
}

fn default_handle_prefixed_url() -> String {
    "https://tags.example.org/api/tags?format=json".into()
}
fn default_handle_field() -> String {
    "handle".into()
}
fn default_accepted_prefixes() -> Vec<String> {
    vec!["tech".into(), "topic".into()]
}
fn default_excluded_prefixes() -> Vec<String> {
    vec!["event".into()]
}

/// `[sources.flat_keyed]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatKeyedConfig {
    /// Default location of the JSON tag blob.
    #[serde(default = "default_flat_keyed_url")]
    pub url: String,

    /// Record field that repeats the tag key and is dropped from documents.
    #[serde(default = "default_id_field")]
    pub id_field: String,
}

impl Default for FlatKeyedConfig {
    fn default() -> Self {
        Self {
            url: default_flat_keyed_url(),
            id_field: default_id_field(),
        }
    }
}

fn default_flat_keyed_url() -> String {
    "https://tags.example.org/exports/tags.json".into()
}
fn default_id_field() -> String {
    "class_name".into()
}

/// `[sources.csv_categorized]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvCategorizedConfig {
    /// Default location of the CSV export.
    #[serde(default = "default_csv_url")]
    pub url: String,
}

impl Default for CsvCategorizedConfig {
    fn default() -> Self {
        Self {
            url: default_csv_url(),
        }
    }
}

fn default_csv_url() -> String {
    "https://tags.example.org/exports/tags.csv".into()
}

/// What to do when two records derive the same tree path in one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Later record replaces the earlier one.
    #[default]
    LastWriteWins,
    /// Later records for an occupied path are ignored.
    FirstWriteWins,
    /// Abort the run.
    Error,
}

impl std::fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::LastWriteWins => "last-write-wins",
            Self::FirstWriteWins => "first-write-wins",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the assembled tree is written to.
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Duplicate-path handling.
    #[serde(default)]
    pub collision: CollisionPolicy,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            collision: CollisionPolicy::default(),
        }
    }
}

fn default_output_dir() -> String {
    "tagtree-out".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.tagtree/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TagtreeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.tagtree/tagtree.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TagtreeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| TagtreeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    write_default_config(&dir)
}

fn write_default_config(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| TagtreeError::io(dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| TagtreeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TagtreeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

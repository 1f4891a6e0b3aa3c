//! End-to-end import pipeline: fetch, map, serialize, write, then finalize to a content id.

use std::time::Instant;

use tracing::{info, instrument, warn};

use tagtree_shared::{
    AppConfig, CollisionPolicy, ContentId, ImportEntry, ImportMode, Result, SkippedRecord,
    SourceType, TagtreeError,
};
use tagtree_sources::{Adapter, Fetcher};
use tagtree_tree::TreeWriter;

/// What to import and how.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    /// Which adapter handles the payload.
    pub source_type: SourceType,
    /// Override for the adapter's default location.
    pub location: Option<String>,
    /// Run mode.
    pub mode: ImportMode,
}

impl ImportRequest {
    pub fn new(source_type: SourceType) -> Self {
        Self {
            source_type,
            location: None,
            mode: ImportMode::Replace,
        }
    }

    /// Build a request from a source-type tag such as `"flat-keyed"`.
    ///
    /// Unknown tags fail with [`TagtreeError::UnsupportedSourceType`].
    pub fn parse(tag: &str, location: Option<String>, mode: ImportMode) -> Result<Self> {
        Ok(Self {
            source_type: tag.parse()?,
            location,
            mode,
        })
    }
}

/// Result of a successful import run.
#[derive(Debug)]
pub struct ImportOutcome {
    /// Identifier of the finalized tree.
    pub content_id: ContentId,
    /// Distinct documents in the finalized tree.
    pub written: usize,
    /// Records dropped by the adapter.
    pub skipped: Vec<SkippedRecord>,
    /// Paths derived more than once.
    pub collisions: Vec<String>,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each document is written.
    fn entry_written(&self, path: &str, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, outcome: &ImportOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn entry_written(&self, _path: &str, _current: usize, _total: usize) {}
    fn done(&self, _outcome: &ImportOutcome) {}
}

/// Run one import.
///
/// 1. Reject append mode
/// 2. Fetch and map the source with its adapter
/// 3. Serialize and write every entry, in source order
/// 4. Finalize the tree
///
/// Any error before step 4 leaves `tree` unfinalized.
#[instrument(skip_all, fields(source = %request.source_type, mode = %request.mode))]
pub async fn run_import<T: TreeWriter>(
    request: &ImportRequest,
    config: &AppConfig,
    fetcher: &Fetcher,
    mut tree: T,
    progress: &dyn ProgressReporter,
) -> Result<ImportOutcome> {
    let start = Instant::now();

    if request.mode == ImportMode::Append {
        return Err(TagtreeError::UnimplementedMode(request.mode.to_string()));
    }

    progress.phase("Fetching source");
    let adapter = Adapter::new(request.source_type, &config.sources);
    let batch = adapter
        .import(fetcher, request.location.as_deref())
        .await?;

    progress.phase("Writing documents");
    let collisions = write_entries(batch.entries, &mut tree, config.output.collision, progress)?;
    let written = tree.len();

    progress.phase("Finalizing tree");
    let content_id = tree.finalize()?;

    let outcome = ImportOutcome {
        content_id,
        written,
        skipped: batch.skipped,
        collisions,
        elapsed: start.elapsed(),
    };

    progress.done(&outcome);

    info!(
        content_id = %outcome.content_id,
        written = outcome.written,
        skipped = outcome.skipped.len(),
        collisions = outcome.collisions.len(),
        elapsed_ms = outcome.elapsed.as_millis(),
        "import complete"
    );

    Ok(outcome)
}

/// Serialize and write entries in order, applying the collision policy.
///
/// Returns the paths that were derived more than once.
pub fn write_entries<T: TreeWriter>(
    entries: Vec<ImportEntry>,
    tree: &mut T,
    policy: CollisionPolicy,
    progress: &dyn ProgressReporter,
) -> Result<Vec<String>> {
    let total = entries.len();
    let mut collisions = Vec::new();

    for (i, entry) in entries.into_iter().enumerate() {
        let path = entry.path.to_string();

        if tree.contains(&entry.path) {
            match policy {
                CollisionPolicy::LastWriteWins => {
                    warn!(%path, "duplicate path, replacing earlier document");
                }
                CollisionPolicy::FirstWriteWins => {
                    warn!(%path, "duplicate path, keeping earlier document");
                    collisions.push(path);
                    continue;
                }
                CollisionPolicy::Error => {
                    return Err(TagtreeError::PathCollision { path });
                }
            }
            collisions.push(path.clone());
        }

        let bytes = tagtree_canonical::serialize(&entry.document)?;
        tree.write(&entry.path, bytes)?;
        progress.entry_written(&path, i + 1, total);
    }

    Ok(collisions)
}

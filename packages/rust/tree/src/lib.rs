//! Content-addressed tree assembly.
//!
//! The import pipeline only depends on the [`TreeWriter`] contract: write
//! `(path, bytes)` pairs in any order, then finalize exactly once into a
//! [`ContentId`]. Identical sets of pairs always finalize to the same id.
//!
//! This crate provides:
//! - [`MemoryTree`]: in-memory tree, hashed on finalize
//! - [`DirTree`]: same tree, materialized into a directory on finalize

mod dir;
mod memory;

use tagtree_shared::{ContentId, Result, TreePath};

pub use dir::{DirTree, TREE_ID_FILE};
pub use memory::MemoryTree;

/// Accumulates serialized documents and finalizes them into one identifier.
pub trait TreeWriter {
    /// Store `bytes` at `path`, replacing anything already there.
    fn write(&mut self, path: &TreePath, bytes: Vec<u8>) -> Result<()>;

    /// Whether a blob is already stored at `path`.
    fn contains(&self, path: &TreePath) -> bool;

    /// Number of blobs stored.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the writer and produce the tree's content identifier.
    fn finalize(self) -> Result<ContentId>
    where
        Self: Sized;
}

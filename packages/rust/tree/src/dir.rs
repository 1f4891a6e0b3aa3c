//! Directory-backed tree writer.
//!
//! Buffers writes in a [`MemoryTree`] and only touches disk on
//! [`TreeWriter::finalize`]. The whole tree is written into a staging
//! sibling first and then renamed over the output directory, so a failed
//! run leaves the previous tree (or nothing) in place.
//!
//! ```text
//! <out>/
//! ├── TREE_ID
//! ├── clean-water.toml
//! └── tech/
//!     └── cloud.toml
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use tagtree_shared::{ContentId, Result, TagtreeError, TreePath};

use crate::{MemoryTree, TreeWriter};

/// File holding the finalized content identifier.
pub const TREE_ID_FILE: &str = "TREE_ID";

/// Writes the finalized tree into a directory.
#[derive(Debug)]
pub struct DirTree {
    dir: PathBuf,
    tree: MemoryTree,
}

impl DirTree {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tree: MemoryTree::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TreeWriter for DirTree {
    fn write(&mut self, path: &TreePath, bytes: Vec<u8>) -> Result<()> {
        self.tree.write(path, bytes)
    }

    fn contains(&self, path: &TreePath) -> bool {
        self.tree.contains(path)
    }

    fn len(&self) -> usize {
        self.tree.len()
    }

    #[instrument(skip_all, fields(dir = %self.dir.display(), blobs = self.tree.len()))]
    fn finalize(self) -> Result<ContentId> {
        let id = self.tree.content_id();
        materialize(&self.dir, &id, self.tree.files())?;
        info!(%id, files = self.tree.len(), "tree written");
        Ok(id)
    }
}

/// Write `files` plus `TREE_ID` into a staging sibling of `dir`, then swap
/// it into place.
///
/// On any error the staging directory is removed and `dir` is untouched.
fn materialize(dir: &Path, id: &ContentId, files: Vec<(Vec<&str>, &[u8])>) -> Result<()> {
    check_target(dir)?;

    let staging = sibling(dir, "tmp")?;
    let staged = write_staging(&staging, id, files).and_then(|()| swap_into_place(&staging, dir));
    if staged.is_err() {
        remove_quietly(&staging);
    }
    staged
}

/// `dir` may be missing, empty, or a previous output marked by `TREE_ID`.
/// Any other non-empty directory is left alone and reported as an error.
fn check_target(dir: &Path) -> Result<()> {
    if !dir.exists() || dir.join(TREE_ID_FILE).is_file() {
        return Ok(());
    }

    let is_empty = std::fs::read_dir(dir)
        .map_err(|e| TagtreeError::io(dir, e))?
        .next()
        .is_none();
    if is_empty {
        Ok(())
    } else {
        Err(TagtreeError::validation(format!(
            "output directory {} is not empty and holds no {TREE_ID_FILE}",
            dir.display()
        )))
    }
}

/// `<parent>/.<name>.<tag>-<uuid>`, next to `dir` so renames stay on one filesystem.
fn sibling(dir: &Path, tag: &str) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            TagtreeError::validation(format!("output path {} has no final component", dir.display()))
        })?;
    Ok(dir.with_file_name(format!(".{name}.{tag}-{}", uuid::Uuid::now_v7())))
}

fn write_staging(staging: &Path, id: &ContentId, files: Vec<(Vec<&str>, &[u8])>) -> Result<()> {
    std::fs::create_dir_all(staging).map_err(|e| TagtreeError::io(staging, e))?;

    for (segments, bytes) in files {
        let target = segments
            .iter()
            .fold(staging.to_path_buf(), |path, segment| path.join(segment));
        write_file(&target, bytes)?;
    }

    // Last, so a staging dir without TREE_ID is never a complete tree.
    write_file(&staging.join(TREE_ID_FILE), format!("{id}\n").as_bytes())
}

fn write_file(target: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| TagtreeError::io(parent, e))?;
    }
    std::fs::write(target, bytes).map_err(|e| TagtreeError::io(target, e))?;
    debug!(path = %target.display(), size = bytes.len(), "wrote file");
    Ok(())
}

/// Rename `staging` to `dir`, moving any previous output aside first and
/// deleting it only once the new tree is in place.
fn swap_into_place(staging: &Path, dir: &Path) -> Result<()> {
    if !dir.exists() {
        if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| TagtreeError::io(parent, e))?;
        }
        return std::fs::rename(staging, dir).map_err(|e| TagtreeError::io(dir, e));
    }

    let previous = sibling(dir, "old")?;
    std::fs::rename(dir, &previous).map_err(|e| TagtreeError::io(dir, e))?;

    if let Err(e) = std::fs::rename(staging, dir) {
        if let Err(restore) = std::fs::rename(&previous, dir) {
            warn!(
                previous = %previous.display(),
                error = %restore,
                "could not restore previous tree output"
            );
        }
        return Err(TagtreeError::io(dir, e));
    }

    debug!(path = %dir.display(), "replaced previous tree output");
    remove_quietly(&previous);
    Ok(())
}

fn remove_quietly(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_dir_all(path) {
            warn!(path = %path.display(), error = %e, "could not remove leftover directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("tagtree-dir-test-{}", uuid::Uuid::now_v7()))
    }

    fn path(s: &str) -> TreePath {
        s.parse().unwrap()
    }

    fn fill<T: TreeWriter>(tree: &mut T) {
        tree.write(&path("tech/cloud.toml"), b"title = \"Cloud\"\n".to_vec()).unwrap();
        tree.write(&path("clean-water.toml"), b"description = \"d\"\n".to_vec()).unwrap();
    }

    #[test]
    fn nothing_on_disk_before_finalize() {
        let out = temp_dir();
        let mut tree = DirTree::new(&out);
        fill(&mut tree);
        assert!(!out.exists());
    }

    #[test]
    fn finalize_writes_files_and_id() {
        let out = temp_dir();
        let mut tree = DirTree::new(&out);
        fill(&mut tree);
        let id = tree.finalize().unwrap();

        let cloud = std::fs::read_to_string(out.join("tech/cloud.toml")).unwrap();
        assert_eq!(cloud, "title = \"Cloud\"\n");
        assert!(out.join("clean-water.toml").exists());

        let stored = std::fs::read_to_string(out.join(TREE_ID_FILE)).unwrap();
        assert_eq!(stored.trim(), id.as_str());

        for entry in std::fs::read_dir(out.join("tech")).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.starts_with('.'), "temp file left behind: {name}");
        }

        let _ = std::fs::remove_dir_all(&out);
    }

    #[test]
    fn same_id_as_memory_tree() {
        let out = temp_dir();
        let mut dir_tree = DirTree::new(&out);
        fill(&mut dir_tree);
        let mut mem_tree = MemoryTree::new();
        fill(&mut mem_tree);

        assert_eq!(dir_tree.finalize().unwrap(), mem_tree.finalize().unwrap());
        let _ = std::fs::remove_dir_all(&out);
    }

    #[test]
    fn previous_output_is_replaced() {
        let out = temp_dir();
        let mut first = DirTree::new(&out);
        first.write(&path("stale.toml"), b"x = 1\n".to_vec()).unwrap();
        first.finalize().unwrap();

        let mut second = DirTree::new(&out);
        fill(&mut second);
        second.finalize().unwrap();

        assert!(!out.join("stale.toml").exists());
        assert!(out.join("tech/cloud.toml").exists());
        let _ = std::fs::remove_dir_all(&out);
    }

    #[test]
    fn foreign_directory_is_not_clobbered() {
        let out = temp_dir();
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("notes.txt"), "keep me").unwrap();

        let mut tree = DirTree::new(&out);
        fill(&mut tree);
        let err = tree.finalize().unwrap_err();
        assert!(err.to_string().contains("not empty"));
        assert!(out.join("notes.txt").exists());

        let _ = std::fs::remove_dir_all(&out);
    }
    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    fn leftovers(out: &Path) -> Vec<String> {
        let name = out.file_name().unwrap().to_string_lossy().to_string();
        listing(out.parent().unwrap())
            .into_iter()
            .filter(|n| n.starts_with(&format!(".{name}.")))
            .collect()
    }

    #[test]
    fn failed_finalize_keeps_previous_output() {
        let out = temp_dir();
        let mut first = DirTree::new(&out);
        first.write(&path("good.toml"), b"x = 1\n".to_vec()).unwrap();
        let good_id = first.finalize().unwrap();

        let too_long = format!("{}.toml", "k".repeat(300));
        let id = MemoryTree::new().content_id();
        let files = vec![
            (vec!["a.toml"], b"a = 1\n".as_slice()),
            (vec![too_long.as_str()], b"k = 1\n".as_slice()),
        ];
        assert!(materialize(&out, &id, files).is_err());

        assert_eq!(listing(&out), vec!["TREE_ID", "good.toml"]);
        let stored = std::fs::read_to_string(out.join(TREE_ID_FILE)).unwrap();
        assert_eq!(stored.trim(), good_id.as_str());
        assert!(leftovers(&out).is_empty());

        let mut third = DirTree::new(&out);
        fill(&mut third);
        third.finalize().unwrap();
        assert!(out.join("tech/cloud.toml").exists());
        assert!(!out.join("good.toml").exists());

        let _ = std::fs::remove_dir_all(&out);
    }

    #[test]
    fn failed_first_finalize_leaves_nothing() {
        let out = temp_dir();
        let too_long = format!("{}.toml", "k".repeat(300));
        let id = MemoryTree::new().content_id();
        let files = vec![(vec![too_long.as_str()], b"k = 1\n".as_slice())];

        assert!(materialize(&out, &id, files).is_err());
        assert!(!out.exists());
        assert!(leftovers(&out).is_empty());
    }

    #[test]
    fn replacement_leaves_no_staging_dirs() {
        let out = temp_dir();
        let mut first = DirTree::new(&out);
        fill(&mut first);
        first.finalize().unwrap();
        let mut second = DirTree::new(&out);
        fill(&mut second);
        second.finalize().unwrap();

        assert!(leftovers(&out).is_empty());
        let _ = std::fs::remove_dir_all(&out);
    }
}

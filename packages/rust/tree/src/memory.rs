//! In-memory tree and its hashing scheme.
//!
//! Object ids follow a git-style layout over SHA-256:
//! - blob: `sha256("blob {len}\0" ++ bytes)`
//! - tree: `sha256("tree {len}\0" ++ entries)`, entries in byte order of
//!   their names, each `"{mode} {name}\0" ++ raw 32-byte child id`, with
//!   mode `100644` for blobs and `40000` for subtrees.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use tracing::debug;

use tagtree_shared::{ContentId, Result, TagtreeError, TreePath};

use crate::TreeWriter;

const BLOB_MODE: &str = "100644";
const TREE_MODE: &str = "40000";

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Blob(Vec<u8>),
    Tree(BTreeMap<String, Node>),
}

/// A tree held entirely in memory until finalized.
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    root: BTreeMap<String, Node>,
    blobs: usize,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored bytes at `path`, if any.
    pub fn get(&self, path: &TreePath) -> Option<&[u8]> {
        let (name, dirs) = path.segments().split_last()?;
        let mut current = &self.root;
        for dir in dirs {
            match current.get(dir)? {
                Node::Tree(children) => current = children,
                Node::Blob(_) => return None,
            }
        }
        match current.get(name)? {
            Node::Blob(bytes) => Some(bytes.as_slice()),
            Node::Tree(_) => None,
        }
    }

    /// Every stored blob as `(segments, bytes)`, in path order.
    pub fn files(&self) -> Vec<(Vec<&str>, &[u8])> {
        let mut out = Vec::with_capacity(self.blobs);
        collect_files(&self.root, &mut Vec::new(), &mut out);
        out
    }

    /// Content identifier of the current state without consuming the tree.
    pub fn content_id(&self) -> ContentId {
        ContentId::from_digest(&hash_tree(&self.root))
    }
}

impl TreeWriter for MemoryTree {
    fn write(&mut self, path: &TreePath, bytes: Vec<u8>) -> Result<()> {
        let Some((name, dirs)) = path.segments().split_last() else {
            return Err(TagtreeError::validation("empty tree path"));
        };

        let mut current = &mut self.root;
        for dir in dirs {
            current = match current
                .entry(dir.clone())
                .or_insert_with(|| Node::Tree(BTreeMap::new()))
            {
                Node::Tree(children) => children,
                Node::Blob(_) => {
                    return Err(TagtreeError::validation(format!(
                        "cannot write {path}: '{dir}' is already a file"
                    )));
                }
            };
        }

        match current.insert(name.clone(), Node::Blob(bytes)) {
            None => self.blobs += 1,
            Some(Node::Blob(_)) => debug!(%path, "replaced existing blob"),
            Some(previous @ Node::Tree(_)) => {
                current.insert(name.clone(), previous);
                return Err(TagtreeError::validation(format!(
                    "cannot write {path}: it is already a directory"
                )));
            }
        }
        Ok(())
    }

    fn contains(&self, path: &TreePath) -> bool {
        self.get(path).is_some()
    }

    fn len(&self) -> usize {
        self.blobs
    }

    fn finalize(self) -> Result<ContentId> {
        let id = self.content_id();
        debug!(%id, blobs = self.blobs, "memory tree finalized");
        Ok(id)
    }
}

fn collect_files<'a>(
    tree: &'a BTreeMap<String, Node>,
    prefix: &mut Vec<&'a str>,
    out: &mut Vec<(Vec<&'a str>, &'a [u8])>,
) {
    for (name, node) in tree {
        prefix.push(name.as_str());
        match node {
            Node::Blob(bytes) => out.push((prefix.clone(), bytes.as_slice())),
            Node::Tree(children) => collect_files(children, prefix, out),
        }
        prefix.pop();
    }
}

fn hash_object(kind: &str, body: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(format!("{kind} {}\0", body.len()).as_bytes());
    hasher.update(body);
    let mut id = [0u8; 32];
    id.copy_from_slice(&hasher.finalize());
    id
}

fn hash_tree(tree: &BTreeMap<String, Node>) -> [u8; 32] {
    let mut body = Vec::new();
    for (name, node) in tree {
        let (mode, id) = match node {
            Node::Blob(bytes) => (BLOB_MODE, hash_object("blob", bytes)),
            Node::Tree(children) => (TREE_MODE, hash_tree(children)),
        };
        body.extend_from_slice(mode.as_bytes());
        body.push(b' ');
        body.extend_from_slice(name.as_bytes());
        body.push(0);
        body.extend_from_slice(&id);
    }
    hash_object("tree", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> TreePath {
        s.parse().unwrap()
    }

    #[test]
    fn write_order_does_not_change_id() {
        let mut a = MemoryTree::new();
        a.write(&path("tech/cloud.toml"), b"title = \"Cloud\"\n".to_vec()).unwrap();
        a.write(&path("topic/health.toml"), b"title = \"Health\"\n".to_vec()).unwrap();
        a.write(&path("water.toml"), b"x = 1\n".to_vec()).unwrap();

        let mut b = MemoryTree::new();
        b.write(&path("water.toml"), b"x = 1\n".to_vec()).unwrap();
        b.write(&path("topic/health.toml"), b"title = \"Health\"\n".to_vec()).unwrap();
        b.write(&path("tech/cloud.toml"), b"title = \"Cloud\"\n".to_vec()).unwrap();

        assert_eq!(a.finalize().unwrap(), b.finalize().unwrap());
    }

    #[test]
    fn content_changes_id() {
        let mut a = MemoryTree::new();
        a.write(&path("a.toml"), b"x = 1\n".to_vec()).unwrap();
        let mut b = MemoryTree::new();
        b.write(&path("a.toml"), b"x = 2\n".to_vec()).unwrap();
        assert_ne!(a.finalize().unwrap(), b.finalize().unwrap());
    }

    #[test]
    fn location_changes_id() {
        let mut a = MemoryTree::new();
        a.write(&path("tech/a.toml"), b"x\n".to_vec()).unwrap();
        let mut b = MemoryTree::new();
        b.write(&path("topic/a.toml"), b"x\n".to_vec()).unwrap();
        assert_ne!(a.finalize().unwrap(), b.finalize().unwrap());
    }

    #[test]
    fn overwrite_keeps_count_and_last_bytes() {
        let mut tree = MemoryTree::new();
        tree.write(&path("tech/a.toml"), b"first".to_vec()).unwrap();
        tree.write(&path("tech/a.toml"), b"second".to_vec()).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(&path("tech/a.toml")), Some(&b"second"[..]));
        assert!(tree.contains(&path("tech/a.toml")));
        assert!(!tree.contains(&path("tech")));
    }

    #[test]
    fn file_directory_conflict_is_rejected() {
        let mut tree = MemoryTree::new();
        tree.write(&path("tech"), b"x".to_vec()).unwrap();
        assert!(tree.write(&path("tech/a.toml"), b"y".to_vec()).is_err());

        let mut tree = MemoryTree::new();
        tree.write(&path("tech/a.toml"), b"y".to_vec()).unwrap();
        assert!(tree.write(&path("tech"), b"x".to_vec()).is_err());
        assert_eq!(tree.get(&path("tech/a.toml")), Some(&b"y"[..]));
    }

    #[test]
    fn empty_tree_has_stable_id() {
        let id = MemoryTree::new().finalize().unwrap();
        assert_eq!(id.as_str().len(), 64);
        assert_eq!(id, MemoryTree::new().finalize().unwrap());
    }

    #[test]
    fn files_listed_in_path_order() {
        let mut tree = MemoryTree::new();
        tree.write(&path("topic/b.toml"), b"b".to_vec()).unwrap();
        tree.write(&path("a.toml"), b"a".to_vec()).unwrap();
        tree.write(&path("tech/c.toml"), b"c".to_vec()).unwrap();

        let names: Vec<String> = tree.files().iter().map(|(p, _)| p.join("/")).collect();
        assert_eq!(names, ["a.toml", "tech/c.toml", "topic/b.toml"]);
    }
}

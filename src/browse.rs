//! Read-only views of the managed root: `map`, `open` and `tree`.

use crate::error::{DirkeepError, Result};
use crate::layout::Layout;
use crate::utils;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One directory in a `map` listing with the files directly inside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapEntry {
    /// Directory path relative to the root, `./` for the root itself
    pub directory: String,
    /// File names directly inside, sorted
    pub files: Vec<String>,
}

/// Every directory under `root`, each followed by its files
pub fn map(root: &Path) -> Result<Vec<MapEntry>> {
    if !root.is_dir() {
        return Err(DirkeepError::not_found(root));
    }

    let mut entries: Vec<MapEntry> = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let rel = utils::make_relative(entry.path(), root)?;
        let name = utils::to_entry_name(&rel);
        let directory = if name.is_empty() { "./".to_string() } else { format!("{}/", name) };

        let mut files = Vec::new();
        for child in fs::read_dir(entry.path())? {
            let child = child?;
            if !child.file_type()?.is_dir() {
                files.push(child.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort();
        entries.push(MapEntry { directory, files });
    }
    Ok(entries)
}

/// What `open` found at a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenResult {
    /// Sorted child names of a directory
    Directory(Vec<String>),
    /// File contents, lossily decoded as UTF-8
    File(String),
    /// Nothing there
    NotFound(PathBuf),
}

/// List a directory or read a file inside `root`
///
/// An empty `rel` opens the root itself. Paths that would leave the root are
/// rejected.
pub fn open(root: &Path, rel: &Path) -> Result<OpenResult> {
    if !utils::is_contained(rel) {
        return Err(DirkeepError::invalid_config(format!(
            "{:?} is outside the managed root",
            rel
        )));
    }

    let target = root.join(rel);
    if target.is_dir() {
        let mut names = fs::read_dir(&target)?
            .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<std::io::Result<Vec<_>>>()?;
        names.sort();
        Ok(OpenResult::Directory(names))
    } else if target.is_file() {
        let bytes = fs::read(&target)?;
        Ok(OpenResult::File(String::from_utf8_lossy(&bytes).into_owned()))
    } else {
        Ok(OpenResult::NotFound(rel.to_path_buf()))
    }
}

/// Nested directory structure for the JSON tree dump
///
/// Directories serialize as objects keyed by child name and files as the
/// string `"file"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    /// A directory and its children
    Directory(BTreeMap<String, TreeNode>),
    /// Anything that is not a directory
    File,
}

impl Serialize for TreeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            TreeNode::Directory(children) => children.serialize(serializer),
            TreeNode::File => serializer.serialize_str("file"),
        }
    }
}

impl TreeNode {
    /// Number of file leaves below this node
    pub fn file_count(&self) -> usize {
        match self {
            TreeNode::File => 1,
            TreeNode::Directory(children) => children.values().map(TreeNode::file_count).sum(),
        }
    }
}

/// Build the tree of `path`; symlinks are leaves
pub fn tree(path: &Path) -> Result<TreeNode> {
    let meta = fs::symlink_metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DirkeepError::not_found(path)
        } else {
            e.into()
        }
    })?;
    if !meta.is_dir() {
        return Ok(TreeNode::File);
    }

    let mut children = BTreeMap::new();
    for child in fs::read_dir(path)? {
        let child = child?;
        let name = child.file_name().to_string_lossy().into_owned();
        children.insert(name, tree(&child.path())?);
    }
    Ok(TreeNode::Directory(children))
}

/// Tree dump of the managed root and, if present, the mirror
#[derive(Debug, Clone, Serialize)]
pub struct TreeDocument {
    /// Managed root
    #[serde(rename = "LOCAL")]
    pub local: TreeNode,
    /// Mirror slot, `null` when absent
    #[serde(rename = "MIRROR")]
    pub mirror: Option<TreeNode>,
}

/// Build the [`TreeDocument`] for a layout
pub fn tree_document(layout: &Layout) -> Result<TreeDocument> {
    let mirror = if layout.mirror.is_dir() {
        Some(tree(&layout.mirror)?)
    } else {
        None
    };
    Ok(TreeDocument {
        local: tree(&layout.root)?,
        mirror,
    })
}

//! Fixed filesystem layout
//!
//! A [`Layout`] names the four paths dirkeep works with: the managed root and
//! the three slots kept beside it. It is built once and handed to every
//! component, so nothing in the crate reads paths from globals.
//!
//! The default slots live in the root's parent directory:
//!
//! ```text
//! parent/
//! ├── project/            managed root
//! ├── .backup_rewind01/   snapshot slot
//! ├── bot_local_master/   mirror slot
//! └── local_master.zip    archive
//! ```

use crate::error::{DirkeepError, Result};
use crate::utils;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default name of the snapshot directory
pub const DEFAULT_SNAPSHOT_NAME: &str = ".backup_rewind01";
/// Default name of the mirror directory
pub const DEFAULT_MIRROR_NAME: &str = "bot_local_master";
/// Default name of the archive file
pub const DEFAULT_ARCHIVE_NAME: &str = "local_master.zip";

/// The managed root and its snapshot, mirror and archive paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Directory tree under management
    pub root: PathBuf,
    /// Single snapshot slot
    pub snapshot: PathBuf,
    /// Single mirror slot
    pub mirror: PathBuf,
    /// Archive produced from the mirror
    pub archive: PathBuf,
}

impl Layout {
    /// Layout with every slot at its default location beside `root`
    pub fn beside(root: impl AsRef<Path>) -> Result<Self> {
        let root = absolute(root.as_ref())?;
        let parent = root
            .parent()
            .ok_or_else(|| DirkeepError::invalid_config(format!(
                "managed root {:?} has no parent directory to hold its snapshot and mirror",
                root
            )))?
            .to_path_buf();

        Self::new(
            root,
            parent.join(DEFAULT_SNAPSHOT_NAME),
            parent.join(DEFAULT_MIRROR_NAME),
            parent.join(DEFAULT_ARCHIVE_NAME),
        )
    }

    /// Layout with explicit paths; relative paths are resolved against the
    /// current directory
    pub fn new(
        root: impl AsRef<Path>,
        snapshot: impl AsRef<Path>,
        mirror: impl AsRef<Path>,
        archive: impl AsRef<Path>,
    ) -> Result<Self> {
        let layout = Layout {
            root: absolute(root.as_ref())?,
            snapshot: absolute(snapshot.as_ref())?,
            mirror: absolute(mirror.as_ref())?,
            archive: absolute(archive.as_ref())?,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Check that no slot overlaps the root or another slot
    ///
    /// A slot inside the root would be copied into itself on every snapshot or
    /// sync, and a slot containing the root would be destroyed by a rewind.
    /// Paths are compared after resolving symlinks in their existing part, so
    /// a slot cannot reach into the root through a linked parent directory.
    pub fn validate(&self) -> Result<()> {
        let root = resolve(&self.root)?;
        let snapshot = resolve(&self.snapshot)?;
        let mirror = resolve(&self.mirror)?;
        let archive = resolve(&self.archive)?;
        let slots = [
            ("snapshot", &snapshot),
            ("mirror", &mirror),
            ("archive", &archive),
        ];

        for (name, path) in slots {
            if path.starts_with(&root) || root.starts_with(path) {
                return Err(DirkeepError::invalid_config(format!(
                    "{} path {:?} overlaps managed root {:?}",
                    name, path, root
                )));
            }
        }

        for (i, (a_name, a)) in slots.iter().enumerate() {
            for (b_name, b) in &slots[i + 1..] {
                if a.starts_with(b) || b.starts_with(a) {
                    return Err(DirkeepError::invalid_config(format!(
                        "{} path {:?} overlaps {} path {:?}",
                        a_name, a, b_name, b
                    )));
                }
            }
        }

        Ok(())
    }

    /// Existence and age of every path in the layout
    pub fn status(&self) -> LayoutStatus {
        LayoutStatus {
            root: PathStatus::probe(&self.root),
            snapshot: PathStatus::probe(&self.snapshot),
            mirror: PathStatus::probe(&self.mirror),
            archive: PathStatus::probe(&self.archive),
            archive_parent_exists: self.archive.parent().map(Path::is_dir).unwrap_or(false),
        }
    }
}

/// Existence report for one layout path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStatus {
    /// Path probed
    pub path: PathBuf,
    /// Whether anything exists there
    pub exists: bool,
    /// Last modification time, when it exists
    pub modified: Option<DateTime<Utc>>,
}

impl PathStatus {
    fn probe(path: &Path) -> Self {
        let modified = utils::modified_utc(path);
        PathStatus {
            path: path.to_path_buf(),
            exists: modified.is_some() || path.exists(),
            modified,
        }
    }
}

/// Snapshot of the whole layout's state, as printed by `debug`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutStatus {
    /// Managed root
    pub root: PathStatus,
    /// Snapshot slot
    pub snapshot: PathStatus,
    /// Mirror slot
    pub mirror: PathStatus,
    /// Archive file
    pub archive: PathStatus,
    /// Whether the archive can be written without creating directories
    pub archive_parent_exists: bool,
}

fn absolute(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(utils::normalize(&joined))
}

/// Canonicalize the deepest existing ancestor of `path` and re-append the
/// components that do not exist yet
fn resolve(path: &Path) -> Result<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(path.to_path_buf()),
        }
    }

    let mut resolved = existing.canonicalize()?;
    for name in missing.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

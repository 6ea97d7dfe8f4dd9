//! Slot replacement
//!
//! Rewind and sync both throw away one tree and put a fresh copy of another in
//! its place. [`replace_tree`] does that under one of two strategies:
//!
//! - [`ReplaceStrategy::InPlace`] deletes the target, then copies. If the copy
//!   fails the target is left empty or partial, and nothing rolls it back.
//! - [`ReplaceStrategy::Staged`] copies into a hidden sibling first, then swaps
//!   the two with renames. A failed copy leaves the target untouched, and the
//!   target is only missing for the instant between the two renames.
//!
//! [`place_tree`] is the staged copy without a previous tree to swap out. The
//! snapshot store uses it so that a failed snapshot never leaves a partial
//! tree at the snapshot path.
//!
//! Neither strategy locks anything. Two processes replacing the same target
//! at once can interleave.

use crate::error::{DirkeepError, Result, Step};
use crate::tree_ops::{self, CopyStats};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// How an existing tree is swapped for a new copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplaceStrategy {
    /// Copy into a staging directory, then rename into place
    #[default]
    Staged,
    /// Delete the target, then copy straight into it
    InPlace,
}

impl fmt::Display for ReplaceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplaceStrategy::Staged => f.write_str("staged"),
            ReplaceStrategy::InPlace => f.write_str("in-place"),
        }
    }
}

/// What a replacement did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    /// Whether a previous tree existed and was removed
    pub replaced_previous: bool,
    /// Copy counters for the new tree
    pub stats: CopyStats,
}

/// Replace `target` with a fresh recursive copy of `source`
pub fn replace_tree(source: &Path, target: &Path, strategy: ReplaceStrategy) -> Result<Replacement> {
    if !source.is_dir() {
        return Err(DirkeepError::not_found(source));
    }

    match strategy {
        ReplaceStrategy::InPlace => replace_in_place(source, target),
        ReplaceStrategy::Staged => replace_staged(source, target),
    }
}

fn replace_in_place(source: &Path, target: &Path) -> Result<Replacement> {
    let replaced_previous = tree_ops::remove_tree(target)?;
    if replaced_previous {
        warn!("Deleted {:?}; copying {:?} into its place", target, source);
    }
    let stats = tree_ops::copy_tree(source, target)?;
    Ok(Replacement {
        replaced_previous,
        stats,
    })
}

fn replace_staged(source: &Path, target: &Path) -> Result<Replacement> {
    let parent = parent_of(target)?;
    let (stage, staged, stats) = stage_copy(source, parent)?;
    let retired = swap_into_place(&staged, target)?;
    drop(stage);

    if let Some(retired) = &retired {
        warn!("Replaced previous contents of {:?}", target);
        if let Err(e) = tree_ops::remove_tree(retired) {
            warn!("New tree is in place but the old one could not be removed: {}", e);
        }
    }

    Ok(Replacement {
        replaced_previous: retired.is_some(),
        stats,
    })
}

/// Copy `source` to `target`, which must not exist, through a staging
/// directory
///
/// `target` only ever appears complete: a failed copy leaves nothing at
/// `target` and removes the staged files.
pub fn place_tree(source: &Path, target: &Path) -> Result<CopyStats> {
    if !source.is_dir() {
        return Err(DirkeepError::not_found(source));
    }
    if fs::symlink_metadata(target).is_ok() {
        return Err(DirkeepError::step(
            Step::Copy,
            target,
            io::Error::new(io::ErrorKind::AlreadyExists, "destination already exists"),
        ));
    }

    let parent = parent_of(target)?;
    let (_stage, staged, stats) = stage_copy(source, parent)?;
    fs::rename(&staged, target).map_err(|e| DirkeepError::step(Step::Swap, target, e))?;
    Ok(stats)
}

fn parent_of(target: &Path) -> Result<&Path> {
    let parent = target
        .parent()
        .ok_or_else(|| DirkeepError::invalid_config(format!("{:?} has no parent directory", target)))?;
    fs::create_dir_all(parent).map_err(|e| DirkeepError::step(Step::Copy, parent, e))?;
    Ok(parent)
}

/// Copy `source` into a fresh staging directory under `parent`
///
/// The returned guard removes the staging directory, and whatever is still in
/// it, when dropped.
fn stage_copy(source: &Path, parent: &Path) -> Result<(TempDir, PathBuf, CopyStats)> {
    let stage = tempfile::Builder::new()
        .prefix(".dirkeep-stage-")
        .tempdir_in(parent)
        .map_err(|e| DirkeepError::step(Step::Copy, parent, e))?;
    let staged = stage.path().join("tree");
    let stats = tree_ops::copy_tree(source, &staged)?;
    debug!("Staged copy of {:?} at {:?}", source, staged);
    Ok((stage, staged, stats))
}

/// Move `target` aside and `staged` into its place
///
/// Returns where the previous tree was moved, if there was one. If the second
/// rename fails the previous tree is moved back before the error is returned.
fn swap_into_place(staged: &Path, target: &Path) -> Result<Option<PathBuf>> {
    let parent = parent_of(target)?;
    let retired = if fs::symlink_metadata(target).is_ok() {
        let retired = retired_path(parent, target);
        fs::rename(target, &retired).map_err(|e| DirkeepError::step(Step::Swap, target, e))?;
        Some(retired)
    } else {
        None
    };

    if let Err(e) = fs::rename(staged, target) {
        if let Some(retired) = &retired {
            if let Err(restore) = fs::rename(retired, target) {
                warn!("Could not move {:?} back to {:?}: {}", retired, target, restore);
            }
        }
        return Err(DirkeepError::step(Step::Swap, target, e));
    }
    Ok(retired)
}

fn retired_path(parent: &Path, target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut candidate = parent.join(format!(".dirkeep-retired-{}-{}", name, std::process::id()));
    let mut n = 0;
    while fs::symlink_metadata(&candidate).is_ok() {
        n += 1;
        candidate = parent.join(format!(".dirkeep-retired-{}-{}-{}", name, std::process::id(), n));
    }
    candidate
}

//! Recursive copy and delete primitives
//!
//! These are the only functions in the crate that move whole trees. Every
//! failure is reported as a [`DirkeepError::Step`] naming the step and the
//! path it stopped at. Neither function cleans up after itself on failure: a
//! failed copy leaves a partial destination behind and a failed delete leaves
//! part of the tree on disk.

use crate::error::{DirkeepError, Result, Step};
use crate::utils;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Counters for one recursive copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyStats {
    /// Regular files copied
    pub files: usize,
    /// Directories created, not counting the destination root
    pub directories: usize,
    /// Symbolic links recreated
    pub symlinks: usize,
    /// Bytes of file content copied
    pub bytes: u64,
}

/// Copy `src` recursively into `dst`, which must not exist yet
///
/// Directory structure, file contents, permission bits and symlinks (as links,
/// never followed) are preserved.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<CopyStats> {
    if !src.is_dir() {
        return Err(DirkeepError::not_found(src));
    }
    if fs::symlink_metadata(dst).is_ok() {
        return Err(DirkeepError::step(
            Step::Copy,
            dst,
            io::Error::new(io::ErrorKind::AlreadyExists, "destination already exists"),
        ));
    }

    debug!("Copying tree {:?} -> {:?}", src, dst);
    let mut stats = CopyStats::default();
    // Directory modes are applied last so read-only directories can still be filled.
    let mut dir_modes: Vec<(PathBuf, u32)> = Vec::new();

    fs::create_dir_all(dst).map_err(|e| DirkeepError::step(Step::Copy, dst, e))?;
    let root_meta = fs::metadata(src).map_err(|e| DirkeepError::step(Step::Copy, src, e))?;
    dir_modes.push((dst.to_path_buf(), utils::get_permissions(&root_meta)));

    for entry in WalkDir::new(src).min_depth(1).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| src.to_path_buf());
            DirkeepError::step(Step::Copy, path, io::Error::from(e))
        })?;
        let rel = utils::make_relative(entry.path(), src)?;
        let target = dst.join(&rel);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            let link = fs::read_link(entry.path())
                .map_err(|e| DirkeepError::step(Step::Copy, entry.path(), e))?;
            utils::create_symlink(&link, &target)
                .map_err(|e| DirkeepError::step(Step::Copy, &target, e))?;
            stats.symlinks += 1;
            trace!("Linked {:?} -> {:?}", rel, link);
        } else if file_type.is_dir() {
            fs::create_dir(&target).map_err(|e| DirkeepError::step(Step::Copy, &target, e))?;
            let meta = entry
                .metadata()
                .map_err(|e| DirkeepError::step(Step::Copy, entry.path(), io::Error::from(e)))?;
            dir_modes.push((target, utils::get_permissions(&meta)));
            stats.directories += 1;
        } else {
            // fs::copy carries the permission bits over.
            let bytes = fs::copy(entry.path(), &target)
                .map_err(|e| DirkeepError::step(Step::Copy, entry.path(), e))?;
            stats.files += 1;
            stats.bytes += bytes;
            trace!("Copied {:?} ({} bytes)", rel, bytes);
        }
    }

    for (dir, mode) in dir_modes.into_iter().rev() {
        utils::set_permissions(&dir, mode).map_err(|e| DirkeepError::step(Step::Copy, &dir, e))?;
    }

    debug!(
        "Copied {} files, {} directories, {} symlinks ({})",
        stats.files,
        stats.directories,
        stats.symlinks,
        utils::format_bytes(stats.bytes)
    );
    Ok(stats)
}

/// Remove `path` and everything below it
///
/// Returns `false` if nothing was there. A symlink is removed as a link; its
/// target is left alone.
pub fn remove_tree(path: &Path) -> Result<bool> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(DirkeepError::step(Step::Delete, path, e)),
    };

    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|e| DirkeepError::step(Step::Delete, path, e))?;
    debug!("Removed {:?}", path);
    Ok(true)
}

/// Relative paths of every regular file under `root`, sorted
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(utils::make_relative(entry.path(), root)?);
        }
    }
    Ok(files)
}

//! Archiver
//!
//! Packages the mirror into a single deflate-compressed zip file.
//!
//! ## Entry names
//!
//! Entries are named relative to the mirror root with `/` separators, so a
//! mirror holding `a.txt` and `sub/b.txt` produces exactly those two names
//! (plus a `sub/` directory entry). They are not nested under the mirror's
//! own directory name.
//!
//! ## Overwrite behavior
//!
//! The archive is assembled in a temporary file beside the target and renamed
//! over it once complete. A failed package leaves any previous archive as it
//! was.

use crate::error::{DirkeepError, Result};
use crate::layout::Layout;
use crate::utils;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Summary of a finished archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageReport {
    /// Archive location
    pub path: PathBuf,
    /// Entry names in the order they were written
    pub entries: Vec<String>,
    /// Number of file entries
    pub files: usize,
    /// Number of directory entries
    pub directories: usize,
    /// Uncompressed bytes of file content
    pub bytes: u64,
    /// Size of the archive file on disk
    pub archive_size: u64,
    /// Mirror paths left out of the archive: names that are not valid UTF-8
    /// and symlinks that do not point at a regular file
    pub skipped: Vec<PathBuf>,
}

/// Writes the archive of a layout's mirror
#[derive(Debug, Clone)]
pub struct Archiver<'a> {
    layout: &'a Layout,
    compression_level: Option<i64>,
}

impl<'a> Archiver<'a> {
    /// Archiver for `layout` using deflate's default level
    pub fn new(layout: &'a Layout) -> Self {
        Archiver {
            layout,
            compression_level: None,
        }
    }

    /// Use an explicit deflate level (0-9); 0 stores entries uncompressed
    pub fn with_compression_level(mut self, level: Option<i64>) -> Self {
        self.compression_level = level;
        self
    }

    /// Package every file under the mirror into the archive
    ///
    /// # Errors
    ///
    /// - [`DirkeepError::NotFound`] if there is no mirror; no archive is written
    /// - [`DirkeepError::Io`] / [`DirkeepError::Zip`] if writing fails
    pub fn package(&self) -> Result<PackageReport> {
        let mirror = &self.layout.mirror;
        let target = &self.layout.archive;
        if !mirror.is_dir() {
            warn!("No mirror at {:?}; run sync before package", mirror);
            return Err(DirkeepError::not_found(mirror));
        }

        let parent = target
            .parent()
            .ok_or_else(|| DirkeepError::invalid_config(format!("{:?} has no parent directory", target)))?;
        fs::create_dir_all(parent)?;

        info!("Packaging {:?} into {:?}", mirror, target);
        let mut temp = tempfile::Builder::new()
            .prefix(".dirkeep-archive-")
            .suffix(".zip")
            .tempfile_in(parent)?;

        let mut report = PackageReport {
            path: target.clone(),
            entries: Vec::new(),
            files: 0,
            directories: 0,
            bytes: 0,
            archive_size: 0,
            skipped: Vec::new(),
        };

        {
            let mut zip = ZipWriter::new(temp.as_file_mut());
            // Level 0 means no compression; the deflate backend rejects it.
            let base = match self.compression_level {
                Some(0) => SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
                level => SimpleFileOptions::default()
                    .compression_method(CompressionMethod::Deflated)
                    .compression_level(level),
            };

            for entry in WalkDir::new(mirror).min_depth(1).follow_links(false).sort_by_file_name() {
                let entry = entry?;
                let rel = utils::make_relative(entry.path(), mirror)?;
                let file_type = entry.file_type();
                // Lossy names could collide, so such entries are left out.
                let Some(name) = utils::to_exact_entry_name(&rel) else {
                    warn!("Skipping {:?}: name is not valid UTF-8", rel);
                    report.skipped.push(rel);
                    continue;
                };

                if file_type.is_dir() {
                    zip.add_directory(name.clone(), base)?;
                    report.directories += 1;
                    report.entries.push(format!("{}/", name));
                    continue;
                }

                let meta = if file_type.is_symlink() {
                    match fs::metadata(entry.path()) {
                        Ok(meta) if meta.is_file() => meta,
                        _ => {
                            warn!("Skipping symlink {:?}: it does not point at a regular file", rel);
                            report.skipped.push(rel);
                            continue;
                        }
                    }
                } else {
                    entry.metadata()?
                };

                let options = base.unix_permissions(utils::get_permissions(&meta) & 0o777);
                zip.start_file(name.clone(), options)?;
                let mut source = File::open(entry.path())?;
                let bytes = io::copy(&mut source, &mut zip)?;
                trace!("Archived {} ({} bytes)", name, bytes);

                report.files += 1;
                report.bytes += bytes;
                report.entries.push(name);
            }

            zip.finish()?;
        }

        temp.persist(target).map_err(|e| DirkeepError::Io(e.error))?;
        report.archive_size = fs::metadata(target)?.len();

        if report.entries.is_empty() {
            info!("Mirror {:?} is empty; wrote an archive with no entries", mirror);
        }
        debug!(
            "Archive has {} files and {} directories ({} -> {})",
            report.files,
            report.directories,
            utils::format_bytes(report.bytes),
            utils::format_bytes(report.archive_size)
        );
        Ok(report)
    }
}

/// Entry names stored in an archive, in archive order
pub fn list_archive(path: &Path) -> Result<Vec<String>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(DirkeepError::not_found(path)),
        Err(e) => return Err(e.into()),
    };
    let archive = ZipArchive::new(file)?;
    Ok(archive.file_names().map(str::to_string).collect())
}

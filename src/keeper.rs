//! Main dirkeep implementation
//!
//! [`Dirkeep`] ties a [`Layout`] to the options every operation needs and
//! exposes one method per command. It holds no other state: each call looks
//! at the filesystem afresh, so two `Dirkeep` values over the same layout see
//! the same snapshot and mirror.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use dirkeep::{Dirkeep, SnapshotOutcome};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let keeper = Dirkeep::open("./my_project")?;
//!
//! if let SnapshotOutcome::AlreadyExists { path } = keeper.snapshot()? {
//!     println!("keeping the snapshot at {}", path.display());
//! }
//!
//! keeper.sync()?;
//! let report = keeper.package()?;
//! println!("archived {} files", report.files);
//! # Ok(())
//! # }
//! ```

use crate::archive::{Archiver, PackageReport};
use crate::browse::{self, MapEntry, OpenResult, TreeDocument};
use crate::checksum::{self, ChecksumReport, Digest, DEFAULT_CHUNK_SIZE};
use crate::error::{DirkeepError, Result};
use crate::layout::{Layout, LayoutStatus};
use crate::replace::ReplaceStrategy;
use crate::rewind::{RewindEngine, RewindOutcome};
use crate::snapshot::{SnapshotOutcome, SnapshotStore};
use crate::sync::{MirrorSync, SyncOutcome};
use crate::tree_ops::CopyStats;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Entry point for every dirkeep operation
#[derive(Debug, Clone)]
pub struct Dirkeep {
    layout: Layout,
    strategy: ReplaceStrategy,
    chunk_size: usize,
    compression_level: Option<i64>,
}

impl Dirkeep {
    /// Manage `root` with the default layout and options
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        DirkeepBuilder::new().build(root)
    }

    /// Layout in use
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Replace strategy used by rewind and sync
    pub fn strategy(&self) -> ReplaceStrategy {
        self.strategy
    }

    /// Copy the root into the snapshot slot unless a snapshot already exists
    #[instrument(skip(self), fields(root = ?self.layout.root))]
    pub fn snapshot(&self) -> Result<SnapshotOutcome> {
        SnapshotStore::new(&self.layout).snapshot()
    }

    /// Like [`snapshot`](Self::snapshot) but fails with
    /// [`DirkeepError::StateConflict`] if a snapshot exists
    #[instrument(skip(self), fields(root = ?self.layout.root))]
    pub fn snapshot_strict(&self) -> Result<CopyStats> {
        SnapshotStore::new(&self.layout).snapshot_strict()
    }

    /// Replace the root with the snapshot's contents
    #[instrument(skip(self), fields(root = ?self.layout.root, strategy = %self.strategy))]
    pub fn rewind(&self) -> Result<RewindOutcome> {
        RewindEngine::new(&self.layout, self.strategy).rewind()
    }

    /// Replace the mirror with a fresh copy of the root
    #[instrument(skip(self), fields(root = ?self.layout.root, strategy = %self.strategy))]
    pub fn sync(&self) -> Result<SyncOutcome> {
        MirrorSync::new(&self.layout, self.strategy).sync()
    }

    /// Package the mirror into the archive
    #[instrument(skip(self), fields(mirror = ?self.layout.mirror))]
    pub fn package(&self) -> Result<PackageReport> {
        Archiver::new(&self.layout)
            .with_compression_level(self.compression_level)
            .package()
    }

    /// Digest one file
    pub fn checksum(&self, path: &Path) -> Result<Digest> {
        checksum::hash_file(path, self.chunk_size)
    }

    /// Digest every file under the root
    #[instrument(skip(self), fields(root = ?self.layout.root))]
    pub fn verify_all(&self) -> Result<ChecksumReport> {
        let report = checksum::verify_all(&self.layout.root, self.chunk_size)?;
        info!("Computed {} checksums", report.files.len());
        Ok(report)
    }

    /// Existence status of every layout path
    pub fn status(&self) -> LayoutStatus {
        self.layout.status()
    }

    /// Full tree listing of the root
    pub fn map(&self) -> Result<Vec<MapEntry>> {
        browse::map(&self.layout.root)
    }

    /// Directory listing or file contents of a path inside the root
    pub fn open_path(&self, rel: &Path) -> Result<OpenResult> {
        browse::open(&self.layout.root, rel)
    }

    /// JSON-serializable tree of the root and mirror
    pub fn tree(&self) -> Result<TreeDocument> {
        browse::tree_document(&self.layout)
    }
}

/// Builder for configuring a [`Dirkeep`]
///
/// # Default Values
///
/// - slots: beside the root (see [`Layout::beside`])
/// - `replace_strategy`: [`ReplaceStrategy::Staged`]
/// - `chunk_size`: 8 KiB
/// - `compression_level`: deflate default
#[derive(Debug, Clone)]
pub struct DirkeepBuilder {
    snapshot_path: Option<PathBuf>,
    mirror_path: Option<PathBuf>,
    archive_path: Option<PathBuf>,
    strategy: ReplaceStrategy,
    chunk_size: usize,
    compression_level: Option<i64>,
}

impl DirkeepBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            snapshot_path: None,
            mirror_path: None,
            archive_path: None,
            strategy: ReplaceStrategy::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            compression_level: None,
        }
    }

    /// Put the snapshot slot somewhere other than beside the root
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Put the mirror slot somewhere other than beside the root
    pub fn mirror_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.mirror_path = Some(path.into());
        self
    }

    /// Write the archive somewhere other than beside the root
    pub fn archive_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.archive_path = Some(path.into());
        self
    }

    /// Set how rewind and sync swap trees
    ///
    /// [`ReplaceStrategy::InPlace`] reproduces plain delete-then-copy, which
    /// can leave the target empty if the copy fails.
    pub fn replace_strategy(mut self, strategy: ReplaceStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Read size used when hashing files; must be non-zero
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Deflate level for the archive (0-9); `Some(0)` stores entries without
    /// compression and `None` uses the default
    pub fn compression_level(mut self, level: Option<i64>) -> Self {
        self.compression_level = level;
        self
    }

    /// Build a [`Dirkeep`] managing `root`
    ///
    /// # Errors
    ///
    /// [`DirkeepError::InvalidConfiguration`] if the layout overlaps itself,
    /// the chunk size is zero or the compression level is out of range. The
    /// root does not have to exist yet; operations that need it report
    /// [`DirkeepError::NotFound`].
    pub fn build(self, root: impl AsRef<Path>) -> Result<Dirkeep> {
        if self.chunk_size == 0 {
            return Err(DirkeepError::invalid_config("chunk size must be greater than zero"));
        }
        if let Some(level) = self.compression_level {
            if !(0..=9).contains(&level) {
                return Err(DirkeepError::invalid_config(format!(
                    "compression level {} is outside 0-9",
                    level
                )));
            }
        }

        let defaults = Layout::beside(root.as_ref())?;
        let layout = Layout::new(
            &defaults.root,
            self.snapshot_path.unwrap_or(defaults.snapshot),
            self.mirror_path.unwrap_or(defaults.mirror),
            self.archive_path.unwrap_or(defaults.archive),
        )?;

        Ok(Dirkeep {
            layout,
            strategy: self.strategy,
            chunk_size: self.chunk_size,
            compression_level: self.compression_level,
        })
    }
}

impl Default for DirkeepBuilder {
    fn default() -> Self {
        Self::new()
    }
}

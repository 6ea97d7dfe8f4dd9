//! Snapshot store
//!
//! Holds at most one full copy of the managed root. A snapshot is written once
//! and never overwritten, merged or updated here; to take a new one the old
//! directory has to be removed by hand.

use crate::error::{DirkeepError, Result};
use crate::layout::Layout;
use crate::replace;
use crate::tree_ops::CopyStats;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Result of a snapshot request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SnapshotOutcome {
    /// A new snapshot was written
    Created {
        /// Snapshot location
        path: PathBuf,
        /// Copy counters
        stats: CopyStats,
    },
    /// A snapshot was already there; nothing was written
    AlreadyExists {
        /// Snapshot location
        path: PathBuf,
    },
}

impl SnapshotOutcome {
    /// Whether this call wrote a snapshot
    pub fn is_created(&self) -> bool {
        matches!(self, SnapshotOutcome::Created { .. })
    }
}

/// The single snapshot slot of a layout
#[derive(Debug, Clone)]
pub struct SnapshotStore<'a> {
    layout: &'a Layout,
}

impl<'a> SnapshotStore<'a> {
    /// Snapshot slot for `layout`
    pub fn new(layout: &'a Layout) -> Self {
        SnapshotStore { layout }
    }

    /// Snapshot location
    pub fn path(&self) -> &Path {
        &self.layout.snapshot
    }

    /// Whether a snapshot is present
    pub fn exists(&self) -> bool {
        self.layout.snapshot.exists()
    }

    /// Copy the managed root into the snapshot slot unless one is already there
    ///
    /// # Errors
    ///
    /// - [`DirkeepError::NotFound`] if the managed root is missing
    /// - [`DirkeepError::Step`] if the copy fails; the copy is staged beside
    ///   the snapshot path, so nothing is left there to block later snapshots
    ///   or be rewound to
    pub fn snapshot(&self) -> Result<SnapshotOutcome> {
        let path = self.layout.snapshot.clone();
        if self.exists() {
            info!("Snapshot already exists at {:?}; leaving it untouched", path);
            return Ok(SnapshotOutcome::AlreadyExists { path });
        }
        if !self.layout.root.is_dir() {
            return Err(DirkeepError::not_found(&self.layout.root));
        }

        info!("Snapshotting {:?} to {:?}", self.layout.root, path);
        let stats = replace::place_tree(&self.layout.root, &path).inspect_err(|e| {
            warn!("Snapshot of {:?} failed; no snapshot was written: {}", self.layout.root, e);
        })?;
        info!("Snapshot holds {} files", stats.files);
        Ok(SnapshotOutcome::Created { path, stats })
    }

    /// Like [`snapshot`](Self::snapshot), but an existing snapshot is an error
    pub fn snapshot_strict(&self) -> Result<CopyStats> {
        match self.snapshot()? {
            SnapshotOutcome::Created { stats, .. } => Ok(stats),
            SnapshotOutcome::AlreadyExists { path } => Err(DirkeepError::StateConflict(format!(
                "snapshot already exists at {:?}",
                path
            ))),
        }
    }
}

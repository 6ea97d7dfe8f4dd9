//! Mirror sync
//!
//! Keeps one always-fresh copy of the managed root in the mirror slot. Every
//! sync throws the previous mirror away; the result is never a merge of old
//! and new content.

use crate::error::{DirkeepError, Result};
use crate::layout::Layout;
use crate::replace::{replace_tree, ReplaceStrategy};
use crate::tree_ops::CopyStats;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info};

/// Result of a sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// Mirror location
    pub path: PathBuf,
    /// Whether an older mirror was deleted
    pub replaced_previous: bool,
    /// Copy counters for the new mirror
    pub stats: CopyStats,
    /// Strategy used to swap the trees
    pub strategy: ReplaceStrategy,
}

/// Writes the mirror slot of a layout
#[derive(Debug, Clone)]
pub struct MirrorSync<'a> {
    layout: &'a Layout,
    strategy: ReplaceStrategy,
}

impl<'a> MirrorSync<'a> {
    /// Mirror sync for `layout`
    pub fn new(layout: &'a Layout, strategy: ReplaceStrategy) -> Self {
        MirrorSync { layout, strategy }
    }

    /// Replace the mirror with a fresh copy of the managed root
    ///
    /// A failed in-place sync may leave no mirror at all; the error says
    /// whether the delete or the copy failed.
    pub fn sync(&self) -> Result<SyncOutcome> {
        if !self.layout.root.is_dir() {
            return Err(DirkeepError::not_found(&self.layout.root));
        }

        info!("Syncing {:?} to mirror {:?}", self.layout.root, self.layout.mirror);
        let replacement = replace_tree(&self.layout.root, &self.layout.mirror, self.strategy)
            .inspect_err(|e| error!("Mirror sync failed: {}", e))?;

        info!("Mirror holds {} files", replacement.stats.files);
        Ok(SyncOutcome {
            path: self.layout.mirror.clone(),
            replaced_previous: replacement.replaced_previous,
            stats: replacement.stats,
            strategy: self.strategy,
        })
    }
}

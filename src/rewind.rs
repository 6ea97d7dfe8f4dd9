//! Rewind engine
//!
//! Replaces the managed root with the contents of the snapshot. This is the
//! most destructive operation in the crate: whatever is in the root and not in
//! the snapshot is gone afterwards. The snapshot itself is only read, so a
//! failed rewind can be retried as long as the snapshot is intact.

use crate::error::Result;
use crate::layout::Layout;
use crate::replace::{replace_tree, ReplaceStrategy};
use crate::tree_ops::CopyStats;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Result of a rewind request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RewindOutcome {
    /// The root now matches the snapshot
    Restored {
        /// Copy counters for the restored tree
        stats: CopyStats,
        /// Strategy used to swap the trees
        strategy: ReplaceStrategy,
    },
    /// There was no snapshot; nothing was touched
    NoSnapshot,
}

/// Restores the managed root from the snapshot slot
#[derive(Debug, Clone)]
pub struct RewindEngine<'a> {
    layout: &'a Layout,
    strategy: ReplaceStrategy,
}

impl<'a> RewindEngine<'a> {
    /// Rewind engine for `layout`
    pub fn new(layout: &'a Layout, strategy: ReplaceStrategy) -> Self {
        RewindEngine { layout, strategy }
    }

    /// Replace the managed root with a copy of the snapshot
    ///
    /// With [`ReplaceStrategy::InPlace`] the root is deleted before the copy
    /// starts; if the copy then fails the root is left empty or partial and
    /// the error names the `copy` step.
    pub fn rewind(&self) -> Result<RewindOutcome> {
        if !self.layout.snapshot.is_dir() {
            info!("No snapshot at {:?}; nothing to rewind", self.layout.snapshot);
            return Ok(RewindOutcome::NoSnapshot);
        }

        warn!(
            "Rewinding {:?} from {:?} ({}); current contents will be deleted",
            self.layout.root, self.layout.snapshot, self.strategy
        );
        let replacement = replace_tree(&self.layout.snapshot, &self.layout.root, self.strategy)
            .inspect_err(|e| {
                error!("Rewind of {:?} failed: {}", self.layout.root, e);
            })?;

        info!("Restored {} files into {:?}", replacement.stats.files, self.layout.root);
        Ok(RewindOutcome::Restored {
            stats: replacement.stats,
            strategy: self.strategy,
        })
    }
}

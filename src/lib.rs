//! # dirkeep - single-slot directory keeper
//!
//! Manages one directory tree (the *managed root*) and three artifacts kept
//! beside it:
//!
//! - a **snapshot**: one full backup, written once and never overwritten
//! - a **mirror**: one full copy, replaced on every sync
//! - an **archive**: a zip of the mirror, replaced on every package
//!
//! plus a streaming **checksum** engine for change detection.
//!
//! There is exactly one snapshot slot and one mirror slot. dirkeep keeps no
//! history and does no incremental diffing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dirkeep::{DirkeepBuilder, ReplaceStrategy, RewindOutcome};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let keeper = DirkeepBuilder::new()
//!     .replace_strategy(ReplaceStrategy::Staged)
//!     .build("./my_project")?;
//!
//! keeper.snapshot()?;
//!
//! // ... edit files ...
//!
//! match keeper.rewind()? {
//!     RewindOutcome::Restored { stats, .. } => println!("restored {} files", stats.files),
//!     RewindOutcome::NoSnapshot => println!("nothing to rewind to"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure model
//!
//! Rewind and sync swap whole trees. With [`ReplaceStrategy::InPlace`] the old
//! tree is deleted before the new one is copied, and a failed copy leaves the
//! target empty or partial. [`ReplaceStrategy::Staged`] (the default) copies
//! first and swaps with renames. Errors from either carry the [`Step`] that
//! failed. Nothing is locked: concurrent runs against one layout are not
//! supported.
//!
//! ## Module Organization
//!
//! - [`checksum`]: streaming file digests
//! - [`snapshot`], [`rewind`], [`sync`], [`archive`]: the four operations
//! - [`layout`]: the configured paths and their status
//! - [`browse`]: read-only `map`, `open` and `tree` views
//! - [`error`]: error types and exit codes

pub mod archive;
pub mod browse;
pub mod checksum;
pub mod keeper;
pub mod error;
pub mod layout;
pub mod replace;
pub mod rewind;
pub mod snapshot;
pub mod sync;
pub mod tree_ops;

mod utils;

pub use keeper::{Dirkeep, DirkeepBuilder};
pub use archive::{list_archive, PackageReport};
pub use checksum::{ChecksumReport, Digest, FileDigest};
pub use error::{DirkeepError, Result, Step};
pub use layout::{Layout, LayoutStatus, PathStatus};
pub use replace::ReplaceStrategy;
pub use rewind::RewindOutcome;
pub use snapshot::SnapshotOutcome;
pub use sync::SyncOutcome;
pub use tree_ops::CopyStats;

pub use utils::format_bytes;

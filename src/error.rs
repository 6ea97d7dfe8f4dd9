//! Error types for dirkeep
//!
//! Every fallible operation returns [`Result<T>`]. Failures that happen while a
//! tree is being moved carry the [`Step`] that failed, so an operator can tell a
//! half-deleted slot from a half-copied one.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the dirkeep library
pub type Result<T> = std::result::Result<T, DirkeepError>;

/// The individual filesystem step a tree operation was performing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Recursive removal of an existing tree
    Delete,
    /// Recursive copy of a tree into place
    Copy,
    /// Rename of a staged or retired tree
    Swap,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Delete => f.write_str("delete"),
            Step::Copy => f.write_str("copy"),
            Step::Swap => f.write_str("swap"),
        }
    }
}

/// Main error type for all dirkeep operations
#[derive(Debug, Error)]
pub enum DirkeepError {
    /// A file or directory required by the operation is missing
    #[error("Not found: {path:?}")]
    NotFound {
        /// Path that was expected to exist
        path: PathBuf,
    },

    /// I/O errors outside of a tracked step
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A delete, copy or swap step failed part way through
    #[error("{step} step failed at {path:?}: {source}")]
    Step {
        /// Which step was running
        step: Step,
        /// Path being operated on when the step failed
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The requested operation conflicts with existing state
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// Invalid layout or builder options
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Walk directory error from walkdir crate
    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Errors while writing or reading a zip archive
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Errors during JSON serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DirkeepError {
    /// Create a not-found error for a path
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        DirkeepError::NotFound { path: path.into() }
    }

    /// Wrap an I/O error with the step and path it happened on
    pub fn step(step: Step, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DirkeepError::Step {
            step,
            path: path.into(),
            source,
        }
    }

    /// Create an invalid configuration error with a custom message
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        DirkeepError::InvalidConfiguration(msg.into())
    }

    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        DirkeepError::Internal(msg.into())
    }

    /// Check if this error means something required was missing
    pub fn is_not_found(&self) -> bool {
        match self {
            DirkeepError::NotFound { .. } => true,
            DirkeepError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// The step that failed, if the error came from a tree operation
    pub fn failed_step(&self) -> Option<Step> {
        match self {
            DirkeepError::Step { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Process exit code for this error kind
    ///
    /// `2` is left to clap for usage errors.
    pub fn exit_code(&self) -> i32 {
        if self.is_not_found() {
            return 3;
        }
        match self {
            DirkeepError::Io(_)
            | DirkeepError::Step { .. }
            | DirkeepError::WalkDir(_)
            | DirkeepError::Zip(_) => 4,
            DirkeepError::StateConflict(_) => 5,
            DirkeepError::InvalidConfiguration(_) => 6,
            _ => 1,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            DirkeepError::NotFound { path } => {
                format!("{:?} does not exist. Run 'dirkeep debug' to see the configured layout.", path)
            }
            DirkeepError::Step { step: Step::Copy, path, source } => {
                format!(
                    "Copy into {:?} failed: {}. The target may be empty or partially written; \
                     rerun the command once the cause is fixed.",
                    path, source
                )
            }
            DirkeepError::Step { step: Step::Delete, path, source } => {
                format!(
                    "Removing {:?} failed: {}. Some of the old tree may remain on disk.",
                    path, source
                )
            }
            DirkeepError::Step { step: Step::Swap, path, source } => {
                format!(
                    "Moving the new tree into {:?} failed: {}. Check for leftover \
                     '.dirkeep-' directories next to it.",
                    path, source
                )
            }
            _ => self.to_string(),
        }
    }
}

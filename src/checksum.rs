//! Checksum engine
//!
//! Streams file content through SHA-256 in fixed-size chunks. The digest only
//! depends on the bytes, never on how they were chunked, so two files with the
//! same content always compare equal.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dirkeep::checksum::{hash_file, DEFAULT_CHUNK_SIZE};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let digest = hash_file(Path::new("Cargo.toml"), DEFAULT_CHUNK_SIZE)?;
//! println!("{}", digest);
//! # Ok(())
//! # }
//! ```

use crate::error::{DirkeepError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Default read size for streaming hashes
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// SHA-256 content digest of one file
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering (64 characters)
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short prefix for display
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short())
    }
}

impl FromStr for Digest {
    type Err = DirkeepError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| DirkeepError::internal(format!("invalid digest {:?}: {}", s, e)))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| DirkeepError::internal(format!("digest {:?} is not 32 bytes", s)))?;
        Ok(Digest(array))
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Hash any reader in `chunk_size` pieces
pub fn hash_reader<R: Read>(mut reader: R, chunk_size: usize) -> std::io::Result<Digest> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Digest(hasher.finalize().into()))
}

/// Hash a file's content
///
/// # Errors
///
/// - [`DirkeepError::NotFound`] if `path` is missing or is not a regular file
/// - [`DirkeepError::Io`] if reading fails part way
pub fn hash_file(path: &Path, chunk_size: usize) -> Result<Digest> {
    // Follows symlinks, so a link to a regular file is hashed as that file.
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(DirkeepError::not_found(path)),
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(DirkeepError::not_found(path)),
        Err(e) => return Err(e.into()),
    }

    let file = File::open(path)?;
    let digest = hash_reader(file, chunk_size)?;
    trace!("Hashed {:?}: {}", path, digest.short());
    Ok(digest)
}

/// Digest of one file inside the managed root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDigest {
    /// Path relative to the walked root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Content digest
    pub digest: Digest,
}

/// Result of digesting a whole tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChecksumReport {
    /// One entry per regular file, in sorted walk order
    pub files: Vec<FileDigest>,
    /// Sum of all file sizes
    pub total_bytes: u64,
}

impl ChecksumReport {
    /// Look up the digest recorded for a relative path
    pub fn get(&self, path: &Path) -> Option<&Digest> {
        self.files.iter().find(|f| f.path == path).map(|f| &f.digest)
    }
}

/// Digest every regular file under `root`
///
/// Symlinks are not followed. The first failure aborts the walk.
pub fn verify_all(root: &Path, chunk_size: usize) -> Result<ChecksumReport> {
    if !root.is_dir() {
        return Err(DirkeepError::not_found(root));
    }

    let mut report = ChecksumReport::default();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let size = entry.metadata()?.len();
        let digest = hash_file(entry.path(), chunk_size)?;
        report.files.push(FileDigest {
            path: crate::utils::make_relative(entry.path(), root)?,
            size,
            digest,
        });
        report.total_bytes += size;
    }

    debug!("Digested {} files under {:?}", report.files.len(), root);
    Ok(report)
}

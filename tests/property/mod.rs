//! Property-based testing for dirkeep
//!
//! Uses proptest to check the snapshot, mirror and archive invariants against
//! randomly generated trees and edits.

use ::dirkeep::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Strategy for generating file operations
#[derive(Debug, Clone)]
pub enum FileOperation {
    Create { path: PathBuf, content: Vec<u8> },
    Delete { path: PathBuf },
}

fn file_operation_strategy() -> impl Strategy<Value = FileOperation> {
    prop_oneof![
        3 => (path_strategy(), content_strategy())
            .prop_map(|(path, content)| FileOperation::Create { path, content }),
        1 => path_strategy().prop_map(|path| FileOperation::Delete { path }),
    ]
}

/// Generate random relative file paths
fn path_strategy() -> impl Strategy<Value = PathBuf> {
    let dir_strategy = prop::collection::vec("d[a-c]", 0..=2);
    let filename_strategy = "f[0-9]{1,2}\\.(txt|bin)";

    (dir_strategy, filename_strategy).prop_map(|(dirs, filename)| {
        let mut path = PathBuf::new();
        for dir in dirs {
            path.push(dir);
        }
        path.join(filename)
    })
}

fn content_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        "[a-zA-Z0-9 \n]{0,200}".prop_map(|s| s.into_bytes()),
        prop::collection::vec(any::<u8>(), 0..2000),
    ]
}

/// Apply a file operation to the filesystem
///
/// Directory names (`d*`) and file names (`f*`) never collide, so a create
/// never needs to replace a directory with a file.
fn apply_operation(root: &Path, op: &FileOperation) -> anyhow::Result<()> {
    match op {
        FileOperation::Create { path, content } => {
            let full_path = root.join(path);
            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(full_path, content)?;
        }
        FileOperation::Delete { path } => {
            let full_path = root.join(path);
            if full_path.is_file() {
                fs::remove_file(full_path)?;
            }
        }
    }
    Ok(())
}

fn digest_map(root: &Path) -> BTreeMap<PathBuf, Digest> {
    checksum::verify_all(root, checksum::DEFAULT_CHUNK_SIZE)
        .unwrap()
        .files
        .into_iter()
        .map(|f| (f.path, f.digest))
        .collect()
}

fn new_keeper(temp_dir: &TempDir, strategy: ReplaceStrategy) -> Dirkeep {
    let root = temp_dir.path().join("project");
    fs::create_dir_all(&root).unwrap();
    DirkeepBuilder::new()
        .replace_strategy(strategy)
        .build(root)
        .unwrap()
}

fn strategy_strategy() -> impl Strategy<Value = ReplaceStrategy> {
    prop_oneof![Just(ReplaceStrategy::Staged), Just(ReplaceStrategy::InPlace)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Snapshot, arbitrary edits, rewind: the root matches snapshot time
    #[test]
    fn snapshot_rewind_identity(
        initial in prop::collection::vec(file_operation_strategy(), 0..30),
        edits in prop::collection::vec(file_operation_strategy(), 1..30),
        strategy in strategy_strategy(),
    ) {
        let temp_dir = TempDir::new().unwrap();
        let keeper = new_keeper(&temp_dir, strategy);
        let root = keeper.layout().root.clone();

        for op in &initial {
            apply_operation(&root, op).unwrap();
        }
        keeper.snapshot().unwrap();
        let at_snapshot = digest_map(&root);

        for op in &edits {
            apply_operation(&root, op).unwrap();
        }
        keeper.rewind().unwrap();

        prop_assert_eq!(digest_map(&root), at_snapshot.clone());
        prop_assert_eq!(digest_map(&keeper.layout().snapshot), at_snapshot);
    }

    /// A second snapshot never changes the first
    #[test]
    fn snapshot_is_write_once(
        initial in prop::collection::vec(file_operation_strategy(), 0..20),
        edits in prop::collection::vec(file_operation_strategy(), 1..20),
    ) {
        let temp_dir = TempDir::new().unwrap();
        let keeper = new_keeper(&temp_dir, ReplaceStrategy::Staged);
        let root = keeper.layout().root.clone();

        for op in &initial {
            apply_operation(&root, op).unwrap();
        }
        keeper.snapshot().unwrap();
        let first = digest_map(&keeper.layout().snapshot);

        for op in &edits {
            apply_operation(&root, op).unwrap();
        }
        let outcome = keeper.snapshot().unwrap();

        prop_assert!(!outcome.is_created());
        prop_assert_eq!(digest_map(&keeper.layout().snapshot), first);
    }

    /// Every sync yields exactly the root's current files, never a union
    #[test]
    fn sync_never_merges(
        rounds in prop::collection::vec(
            prop::collection::vec(file_operation_strategy(), 1..15),
            1..5
        ),
        strategy in strategy_strategy(),
    ) {
        let temp_dir = TempDir::new().unwrap();
        let keeper = new_keeper(&temp_dir, strategy);
        let root = keeper.layout().root.clone();

        for ops in &rounds {
            for op in ops {
                apply_operation(&root, op).unwrap();
            }
            keeper.sync().unwrap();
            prop_assert_eq!(digest_map(&keeper.layout().mirror), digest_map(&root));
        }
    }

    /// The archive's file entries are exactly the mirror's files
    #[test]
    fn package_matches_mirror(
        ops in prop::collection::vec(file_operation_strategy(), 0..30),
    ) {
        let temp_dir = TempDir::new().unwrap();
        let keeper = new_keeper(&temp_dir, ReplaceStrategy::Staged);
        let root = keeper.layout().root.clone();

        for op in &ops {
            apply_operation(&root, op).unwrap();
        }
        keeper.sync().unwrap();

        let first = keeper.package().unwrap();
        let second = keeper.package().unwrap();
        prop_assert_eq!(&first.entries, &second.entries);

        let archived: BTreeSet<String> = list_archive(&first.path)
            .unwrap()
            .into_iter()
            .filter(|n| !n.ends_with('/'))
            .collect();
        let mirrored: BTreeSet<String> = digest_map(&keeper.layout().mirror)
            .keys()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect();
        prop_assert_eq!(archived, mirrored);
    }

    /// Digests do not depend on the read size
    #[test]
    fn checksum_chunk_independent(
        content in prop::collection::vec(any::<u8>(), 0..20_000),
        chunk in 1usize..10_000,
    ) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data");
        fs::write(&path, &content).unwrap();

        let a = checksum::hash_file(&path, chunk).unwrap();
        let b = checksum::hash_file(&path, checksum::DEFAULT_CHUNK_SIZE).unwrap();
        prop_assert_eq!(a, b);
    }
}

//! Integration tests for dirkeep
//!
//! Drives the whole snapshot, rewind, sync and package pipeline against
//! generated project trees.

use ::dirkeep::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test harness owning a temporary parent directory with a managed root inside
pub struct DirkeepTestHarness {
    pub temp_dir: TempDir,
    pub keeper: Dirkeep,
    rng: StdRng,
}

impl DirkeepTestHarness {
    /// Create a harness with the given replace strategy
    pub fn new(strategy: ReplaceStrategy) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("project");
        fs::create_dir_all(&root).unwrap();

        let keeper = DirkeepBuilder::new()
            .replace_strategy(strategy)
            .build(&root)
            .unwrap();

        Self {
            temp_dir,
            keeper,
            rng: StdRng::seed_from_u64(42),
        }
    }

    pub fn root(&self) -> &Path {
        &self.keeper.layout().root
    }

    /// Generate `dirs` directories with `files` files each
    pub fn generate_project(&mut self, dirs: usize, files: usize) -> anyhow::Result<()> {
        let root = self.root().to_path_buf();
        for d in 0..dirs {
            let dir = root.join(format!("dir_{}", d));
            fs::create_dir_all(&dir)?;
            for f in 0..files {
                let size = self.rng.random_range(1..4_000);
                let content: Vec<u8> = (0..size).map(|_| self.rng.random()).collect();
                fs::write(dir.join(format!("file_{}.bin", f)), content)?;
            }
        }
        fs::write(root.join("README.md"), "# project")?;
        Ok(())
    }

    /// Delete, modify and add a few files
    pub fn mutate(&mut self) -> anyhow::Result<()> {
        let root = self.root().to_path_buf();
        let files = tree_ops::list_files(&root)?;
        if let Some(victim) = files.first() {
            fs::remove_file(root.join(victim))?;
        }
        if let Some(changed) = files.last() {
            fs::write(root.join(changed), b"modified")?;
        }
        fs::create_dir_all(root.join("new_dir"))?;
        fs::write(root.join("new_dir/added.txt"), "added")?;
        Ok(())
    }
}

/// Relative path -> digest for every file under `root`
pub fn digest_map(root: &Path) -> BTreeMap<PathBuf, Digest> {
    checksum::verify_all(root, checksum::DEFAULT_CHUNK_SIZE)
        .unwrap()
        .files
        .into_iter()
        .map(|f| (f.path, f.digest))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_reference_scenario() {
        let harness = DirkeepTestHarness::new(ReplaceStrategy::InPlace);
        let root = harness.root().to_path_buf();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("a.txt"), "hello").unwrap();
        fs::write(root.join("sub/b.txt"), "world").unwrap();

        harness.keeper.snapshot().unwrap();
        assert_eq!(digest_map(&root), digest_map(&harness.keeper.layout().snapshot));

        fs::remove_file(root.join("a.txt")).unwrap();
        harness.keeper.rewind().unwrap();

        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "hello");
        assert_eq!(fs::read_to_string(root.join("sub/b.txt")).unwrap(), "world");
    }

    #[test]
    #[traced_test]
    fn test_full_pipeline_on_generated_project() {
        for strategy in [ReplaceStrategy::Staged, ReplaceStrategy::InPlace] {
            let mut harness = DirkeepTestHarness::new(strategy);
            harness.generate_project(5, 10).unwrap();
            let original = digest_map(harness.root());

            assert!(harness.keeper.snapshot().unwrap().is_created());
            harness.mutate().unwrap();
            assert_ne!(digest_map(harness.root()), original);

            // Mirror reflects the mutated root, not the snapshot.
            harness.keeper.sync().unwrap();
            let mutated = digest_map(harness.root());
            assert_eq!(digest_map(&harness.keeper.layout().mirror), mutated);

            let report = harness.keeper.package().unwrap();
            let mut archived: Vec<String> = list_archive(&report.path)
                .unwrap()
                .into_iter()
                .filter(|n| !n.ends_with('/'))
                .collect();
            archived.sort();
            let mut expected: Vec<String> = mutated
                .keys()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .collect();
            expected.sort();
            assert_eq!(archived, expected);

            // Rewind brings back the snapshot-time tree exactly.
            harness.keeper.rewind().unwrap();
            assert_eq!(digest_map(harness.root()), original);
            assert!(!harness.root().join("new_dir").exists());
        }
        assert!(logs_contain("current contents will be deleted"));
    }

    #[test]
    #[traced_test]
    fn test_second_snapshot_is_logged_and_skipped() {
        let mut harness = DirkeepTestHarness::new(ReplaceStrategy::Staged);
        harness.generate_project(2, 3).unwrap();

        harness.keeper.snapshot().unwrap();
        let snap = digest_map(&harness.keeper.layout().snapshot);
        harness.mutate().unwrap();

        let outcome = harness.keeper.snapshot().unwrap();
        assert!(matches!(outcome, SnapshotOutcome::AlreadyExists { .. }));
        assert_eq!(digest_map(&harness.keeper.layout().snapshot), snap);
        assert!(logs_contain("Snapshot already exists"));
    }

    #[test]
    fn test_rewind_without_snapshot_keeps_root() {
        let mut harness = DirkeepTestHarness::new(ReplaceStrategy::InPlace);
        harness.generate_project(2, 2).unwrap();
        let before = digest_map(harness.root());

        assert_eq!(harness.keeper.rewind().unwrap(), RewindOutcome::NoSnapshot);
        assert_eq!(digest_map(harness.root()), before);
    }

    #[test]
    fn test_package_without_mirror_fails() {
        let mut harness = DirkeepTestHarness::new(ReplaceStrategy::Staged);
        harness.generate_project(1, 1).unwrap();

        let err = harness.keeper.package().unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.exit_code(), 3);
        assert!(!harness.keeper.layout().archive.exists());
    }

    #[test]
    fn test_status_tracks_pipeline() {
        let mut harness = DirkeepTestHarness::new(ReplaceStrategy::Staged);
        harness.generate_project(1, 1).unwrap();

        let status = harness.keeper.status();
        assert!(status.root.exists);
        assert!(!status.snapshot.exists && !status.mirror.exists && !status.archive.exists);

        harness.keeper.snapshot().unwrap();
        harness.keeper.sync().unwrap();
        harness.keeper.package().unwrap();

        let status = harness.keeper.status();
        assert!(status.snapshot.exists && status.mirror.exists && status.archive.exists);
        assert!(status.archive.modified.is_some());
    }

    #[test]
    fn test_no_staging_leftovers() {
        let mut harness = DirkeepTestHarness::new(ReplaceStrategy::Staged);
        harness.generate_project(2, 2).unwrap();
        harness.keeper.snapshot().unwrap();
        harness.keeper.sync().unwrap();
        harness.keeper.sync().unwrap();
        harness.keeper.rewind().unwrap();
        harness.keeper.package().unwrap();

        let leftovers: Vec<_> = fs::read_dir(harness.temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with(".dirkeep-"))
            .collect();
        assert!(leftovers.is_empty(), "leftovers: {:?}", leftovers);
    }
}

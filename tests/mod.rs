//! Main test module for dirkeep
//!
//! - Integration tests for whole-pipeline scenarios
//! - Property-based tests for the snapshot, mirror and archive invariants
//! - Edge cases for unusual trees

pub mod integration;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::dirkeep::*;
    use std::fs;
    use tempfile::TempDir;

    fn keeper_for(temp_dir: &TempDir) -> Dirkeep {
        let root = temp_dir.path().join("project");
        fs::create_dir_all(&root).unwrap();
        DirkeepBuilder::new().build(&root).unwrap()
    }

    #[test]
    fn test_empty_root_pipeline() {
        let temp_dir = TempDir::new().unwrap();
        let keeper = keeper_for(&temp_dir);

        let synced = keeper.sync().unwrap();
        assert_eq!(synced.stats.files, 0);
        assert!(keeper.layout().mirror.is_dir());

        let report = keeper.package().unwrap();
        assert_eq!(report.files, 0);
        assert!(list_archive(&keeper.layout().archive).unwrap().is_empty());
    }

    #[test]
    fn test_unicode_filenames() {
        let temp_dir = TempDir::new().unwrap();
        let keeper = keeper_for(&temp_dir);
        let root = keeper.layout().root.clone();

        let names = vec!["файл.txt", "文件.txt", "ファイル.txt", "file with spaces.txt"];
        for name in &names {
            fs::write(root.join(name), format!("Content of {}", name)).unwrap();
        }

        keeper.snapshot().unwrap();
        for name in &names {
            fs::remove_file(root.join(name)).unwrap();
        }
        keeper.rewind().unwrap();

        for name in &names {
            let content = fs::read_to_string(root.join(name)).unwrap();
            assert_eq!(content, format!("Content of {}", name));
        }

        keeper.sync().unwrap();
        let mut entries = list_archive(&keeper.package().unwrap().path).unwrap();
        entries.sort();
        let mut expected: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(entries, expected);
    }

    #[test]
    fn test_deep_nesting() {
        let temp_dir = TempDir::new().unwrap();
        let keeper = keeper_for(&temp_dir);

        let mut deep = keeper.layout().root.clone();
        for i in 0..30 {
            deep = deep.join(format!("level{}", i));
        }
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("bottom.txt"), "deep").unwrap();

        keeper.snapshot().unwrap();
        fs::remove_dir_all(keeper.layout().root.join("level0")).unwrap();
        keeper.rewind().unwrap();

        assert_eq!(fs::read_to_string(deep.join("bottom.txt")).unwrap(), "deep");
    }

    #[test]
    fn test_empty_directories_survive_every_copy() {
        let temp_dir = TempDir::new().unwrap();
        let keeper = keeper_for(&temp_dir);
        fs::create_dir_all(keeper.layout().root.join("empty/also_empty")).unwrap();

        keeper.snapshot().unwrap();
        keeper.sync().unwrap();
        assert!(keeper.layout().snapshot.join("empty/also_empty").is_dir());
        assert!(keeper.layout().mirror.join("empty/also_empty").is_dir());

        let entries = list_archive(&keeper.package().unwrap().path).unwrap();
        assert!(entries.contains(&"empty/".to_string()));
        assert!(entries.contains(&"empty/also_empty/".to_string()));
    }

    #[test]
    fn test_large_file_checksum_is_streamed() {
        let temp_dir = TempDir::new().unwrap();
        let keeper = DirkeepBuilder::new()
            .chunk_size(4096)
            .build(temp_dir.path().join("project"))
            .unwrap();
        fs::create_dir_all(&keeper.layout().root).unwrap();

        let big = keeper.layout().root.join("big.bin");
        let content: Vec<u8> = (0..5_000_000u32).map(|i| (i % 253) as u8).collect();
        fs::write(&big, &content).unwrap();

        let streamed = keeper.checksum(&big).unwrap();
        let in_memory = checksum::hash_reader(&content[..], content.len()).unwrap();
        assert_eq!(streamed, in_memory);
    }
}

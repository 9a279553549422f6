use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use framedex_core::ArenaConfig;

use crate::EmbeddingIndex;


const DIM: usize = 4;

fn test_root(prefix: &str) -> PathBuf {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock must be monotonic")
        .as_nanos();

    std::env::temp_dir().join(format!("framedex_engine_{prefix}_{timestamp}"))
}

fn store_path(root: &Path) -> PathBuf {
    root.join("store.fdx")
}

fn cleanup(root: &Path) {
    if root.exists() {
        fs::remove_dir_all(root).expect("temp directory should be removable");
    }
}

fn open_index(root: &Path) -> EmbeddingIndex {
    let config = ArenaConfig::new(DIM, true).expect("config must be valid");
    EmbeddingIndex::open(store_path(root), config).expect("open must succeed")
}

fn names(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|index| format!("{prefix}_{index}")).collect()
}

/// Seeds three vectors into collection "a" and two into "b".
fn seed_two_collections(index: &EmbeddingIndex) {
    index
        .add_to_collection(
            "a",
            names("a", 3),
            vec![
                vec![1.0, 0.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0, 0.0],
                vec![0.0, 0.0, 1.0, 0.0],
            ],
        )
        .expect("add must succeed");
    index
        .add_to_collection(
            "b",
            names("b", 2),
            vec![vec![0.0, 0.0, 0.0, 1.0], vec![1.0, 1.0, 0.0, 0.0]],
        )
        .expect("add must succeed");
}

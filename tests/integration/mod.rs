// Integration test utilities and common code
// WHY: Centralized utilities avoid duplication across integration tests
#![allow(dead_code)]

use els_search::{ElsResult, ElsSearchSummary, StrippedText};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary directory holding text documents for a test
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub root_path: PathBuf,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path().to_path_buf();

        Self {
            temp_dir,
            root_path,
        }
    }

    /// Write a document with the given content
    pub fn create_document<P: AsRef<Path>>(&self, relative_path: P, content: &str) -> PathBuf {
        let file_path = self.root_path.join(relative_path);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }

        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    /// Path inside the fixture directory that does not exist yet
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.root_path.join(name)
    }
}

/// Re-sample the buffer at a hit's positions
pub fn spelled(stripped: &StrippedText, result: &ElsResult) -> String {
    result
        .letter_positions
        .iter()
        .map(|&p| stripped.letters()[p])
        .collect()
}

/// Check the invariants every hit in a summary must satisfy
pub fn assert_summary_consistent(summary: &ElsSearchSummary) {
    let stripped = summary.stripped();
    assert_eq!(summary.total_hits, summary.results.len());
    assert_eq!(summary.skip_distribution.values().sum::<usize>(), summary.total_hits);
    assert_eq!(summary.source_text_length, stripped.len());

    for result in &summary.results {
        assert_ne!(result.skip, 0, "zero skip in {result:?}");
        assert_eq!(spelled(stripped, result), result.term, "hit does not spell its term");
        assert_eq!(result.letter_positions[0], result.start_pos);
        assert_eq!(result.intervening_segments.len(), result.letter_positions.len() - 1);
    }
}

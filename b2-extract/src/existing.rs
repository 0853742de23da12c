//! Pre-scan of the destination tree
//!
//! Built once before the extraction loop when skip-existing is on,
//! then consulted read-only: never used to overwrite anything.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

/// Case-insensitive index of files already under the output root.
#[derive(Debug, Default)]
pub struct ExistingIndex {
    rel_paths: HashSet<String>,
    basenames: HashSet<String>,
}

impl ExistingIndex {
    /// An index that matches nothing (skip-existing off).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Enumerate every file under `root`.
    pub fn scan(root: &Path) -> Self {
        let mut index = Self::default();
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(root) {
                index
                    .rel_paths
                    .insert(rel.to_string_lossy().replace('\\', "/").to_ascii_lowercase());
            }
            if let Some(name) = entry.file_name().to_str() {
                index.basenames.insert(name.to_ascii_lowercase());
            }
        }
        debug!(
            "existing-output index: {} file(s) under {}",
            index.rel_paths.len(),
            root.display()
        );
        index
    }

    pub fn contains_basename(&self, name: &str) -> bool {
        self.basenames.contains(&name.to_ascii_lowercase())
    }

    /// Match a forward-slash path relative to the output root.
    pub fn contains_relative(&self, rel: &str) -> bool {
        self.rel_paths
            .contains(&rel.replace('\\', "/").to_ascii_lowercase())
    }

    pub fn file_count(&self) -> usize {
        self.rel_paths.len()
    }
}

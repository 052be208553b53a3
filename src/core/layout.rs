use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{LabelMapping, OcclusionMode};
use crate::shared::constants;

/// Output root and the label folders crops are filed under.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    folders: BTreeSet<String>,
}

impl OutputLayout {
    pub fn plan(root: &Path, labels: &LabelMapping, mode: OcclusionMode) -> Self {
        let mut folders: BTreeSet<String> =
            labels.folders().into_iter().map(str::to_string).collect();
        if mode.has_occluded_bucket() {
            folders.insert(constants::OCCLUDED_FOLDER.to_string());
        }
        Self {
            root: root.to_path_buf(),
            folders,
        }
    }

    /// Creates the root and every folder. Safe to call more than once.
    pub fn materialize(&self) -> Result<()> {
        for folder in &self.folders {
            let path = self.folder_path(folder);
            fs::create_dir_all(&path)
                .with_context(|| format!("Failed to create output folder: {}", path.display()))?;
        }
        Ok(())
    }

    pub fn folders(&self) -> impl Iterator<Item = &str> {
        self.folders.iter().map(String::as_str)
    }

    pub fn folder_path(&self, folder: &str) -> PathBuf {
        self.root.join(folder)
    }
}

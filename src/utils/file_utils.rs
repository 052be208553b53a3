use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Lists files in `dir` whose extension matches one of `extensions`
/// (case-insensitive), sorted by path.
pub fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_extension(path, extensions))
        .collect();

    files.sort();

    if files.is_empty() {
        anyhow::bail!(
            "No files with extensions {:?} found in '{}'",
            extensions,
            dir.display()
        );
    }

    Ok(files)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            extensions.iter().any(|candidate| candidate.eq_ignore_ascii_case(ext))
        })
}

/// Video identity used in crop file names: the file stem.
pub fn video_identity(video: &Path) -> String {
    video
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}

/// `<annotation_dir>/<video stem>.<extension>`
pub fn annotation_path_for(video: &Path, annotation_dir: &Path, extension: &str) -> PathBuf {
    annotation_dir.join(format!("{}.{}", video_identity(video), extension))
}

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("annotation not found: {0}")]
    Missing(PathBuf),
    #[error("failed to read annotation {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid annotation document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed box in track {track_id}: {reason}")]
    Malformed { track_id: u32, reason: String },
}

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("failed to open video: {0}")]
    Open(String),
    #[error("decode failed: {0}")]
    Decode(#[from] opencv::Error),
}

#[derive(Debug, Error)]
pub enum CropError {
    #[error("box ({x_tl},{y_tl})-({x_br},{y_br}) is empty on a {width}x{height} frame")]
    EmptyRegion {
        x_tl: i32,
        y_tl: i32,
        x_br: i32,
        y_br: i32,
        width: i32,
        height: i32,
    },
    #[error("opencv error: {0}")]
    Encode(#[from] opencv::Error),
    #[error("encoder refused to write {0}")]
    Rejected(PathBuf),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read rules file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid rules file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sampling period for '{0}' must be at least 1")]
    ZeroPeriod(String),
}

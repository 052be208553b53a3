pub const APP_NAME: &str = "annocrop";

pub const ERROR_LOG_FILE: &str = "error.log";
pub const DEBUG_LOG_FILE: &str = "debug.log";
pub const SUMMARY_FILE: &str = "summary.json";

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm"];
pub const DEFAULT_ANNOTATION_EXTENSION: &str = "json";
pub const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

/// Track category whose boxes are turned into crops.
pub const DEFAULT_SUBJECT_LABEL: &str = "person";
pub const BEHAVIOR_ATTRIBUTE: &str = "behavior";

pub const OTHER_FOLDER: &str = "other";
pub const OCCLUDED_FOLDER: &str = "occluded";
pub const OCCLUDED_SUFFIX: &str = "_occluded";

pub const DEFAULT_PERIOD: u32 = 1;
pub const DEFAULT_OCCLUDED_PERIOD: u32 = 7;

/// Built-in (behavior, period) pairs. Each behavior is also its own folder.
pub const DEFAULT_BEHAVIOR_PERIODS: &[(&str, u32)] = &[
    ("neutral", 7),
    ("waving", 3),
    ("handshake", 3),
    ("hugging", 3),
    ("pointing", 3),
];

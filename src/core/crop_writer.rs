use opencv::{
    core::{self, Mat, Rect},
    imgcodecs,
    prelude::*,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::annotation::{BoundingBox, SubjectRecord};
use crate::config::{DatasetConfig, OcclusionMode};
use crate::error::CropError;
use crate::shared::constants;

const JPEG_QUALITY: i32 = 95;

/// Turns one subject box on one decoded frame into an image file.
pub struct CropWriter {
    root: PathBuf,
    config: Arc<DatasetConfig>,
    mode: OcclusionMode,
    extension: String,
}

impl CropWriter {
    pub fn new(root: &Path, config: Arc<DatasetConfig>, mode: OcclusionMode, extension: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            mode,
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn canonical_label(&self, record: &SubjectRecord) -> &str {
        self.config.labels.canonical(record.behavior())
    }

    pub fn destination_folder(&self, record: &SubjectRecord) -> &str {
        if record.occluded && self.mode.has_occluded_bucket() {
            constants::OCCLUDED_FOLDER
        } else {
            self.canonical_label(record)
        }
    }

    /// `{video}_{label}[_occluded]_frame{index:05}.{ext}`. The suffix follows
    /// the record, not the folder it lands in.
    pub fn file_name(&self, record: &SubjectRecord, video: &str, frame_index: u64) -> String {
        let suffix = if record.occluded {
            constants::OCCLUDED_SUFFIX
        } else {
            ""
        };
        format!(
            "{}_{}{}_frame{:05}.{}",
            video,
            self.canonical_label(record),
            suffix,
            frame_index,
            self.extension
        )
    }

    pub fn crop_path(&self, record: &SubjectRecord, video: &str, frame_index: u64) -> PathBuf {
        self.root
            .join(self.destination_folder(record))
            .join(self.file_name(record, video, frame_index))
    }

    /// Writes the crop, overwriting any file already at the path.
    pub fn write(
        &self,
        frame: &Mat,
        record: &SubjectRecord,
        video: &str,
        frame_index: u64,
    ) -> Result<PathBuf, CropError> {
        let (width, height) = (frame.cols(), frame.rows());
        let region = crop_region(&record.bbox, width, height).ok_or(CropError::EmptyRegion {
            x_tl: record.bbox.x_tl,
            y_tl: record.bbox.y_tl,
            x_br: record.bbox.x_br,
            y_br: record.bbox.y_br,
            width,
            height,
        })?;

        let mut crop = Mat::default();
        Mat::roi(frame, region)?.copy_to(&mut crop)?;

        let path = self.crop_path(record, video, frame_index);
        let params = self.encode_params();
        if !imgcodecs::imwrite(&path.to_string_lossy(), &crop, &params)? {
            return Err(CropError::Rejected(path));
        }
        Ok(path)
    }

    fn encode_params(&self) -> core::Vector<i32> {
        if self.extension.eq_ignore_ascii_case("jpg") || self.extension.eq_ignore_ascii_case("jpeg") {
            core::Vector::from_iter([imgcodecs::IMWRITE_JPEG_QUALITY, JPEG_QUALITY])
        } else {
            core::Vector::new()
        }
    }
}

/// The `[y_tl:y_br, x_tl:x_br]` slice of a `width` x `height` frame, clamped
/// to the frame. `None` when nothing is left.
pub fn crop_region(bbox: &BoundingBox, width: i32, height: i32) -> Option<Rect> {
    let x1 = bbox.x_tl.clamp(0, width.max(0));
    let y1 = bbox.y_tl.clamp(0, height.max(0));
    let x2 = bbox.x_br.clamp(0, width.max(0));
    let y2 = bbox.y_br.clamp(0, height.max(0));

    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC3};
    use std::fs;

    fn record(behavior: Option<&str>, occluded: bool) -> SubjectRecord {
        SubjectRecord {
            track_id: 1,
            bbox: BoundingBox::new(10, 10, 50, 50),
            behavior: behavior.map(str::to_string),
            occluded,
        }
    }

    fn writer(root: &Path, mode: OcclusionMode) -> CropWriter {
        CropWriter::new(root, Arc::new(DatasetConfig::default()), mode, "jpg")
    }

    #[test]
    fn test_file_name_convention() {
        let w = writer(Path::new("/out"), OcclusionMode::None);
        assert_eq!(
            w.file_name(&record(Some("waving"), false), "clip", 9),
            "clip_waving_frame00009.jpg"
        );
        assert_eq!(
            w.file_name(&record(Some("juggling"), true), "clip", 123456),
            "clip_other_occluded_frame123456.jpg"
        );
        assert_eq!(
            w.file_name(&record(None, false), "clip", 0),
            "clip_other_frame00000.jpg"
        );
    }

    #[test]
    fn test_destination_folder_by_mode() {
        let occluded = record(Some("waving"), true);
        let clear = record(Some("waving"), false);

        let separate = writer(Path::new("/out"), OcclusionMode::SaveOnly);
        assert_eq!(separate.destination_folder(&occluded), "occluded");
        assert_eq!(separate.destination_folder(&clear), "waving");

        let merged = writer(Path::new("/out"), OcclusionMode::SaveTogether);
        assert_eq!(merged.destination_folder(&occluded), "waving");
        assert_eq!(
            merged.crop_path(&occluded, "clip", 3),
            PathBuf::from("/out/waving/clip_waving_occluded_frame00003.jpg")
        );

        let plain = writer(Path::new("/out"), OcclusionMode::None);
        assert_eq!(plain.destination_folder(&occluded), "waving");
    }

    #[test]
    fn test_crop_region_inside_frame() {
        let rect = crop_region(&BoundingBox::new(10, 10, 50, 50), 100, 100).unwrap();
        assert_eq!(rect, Rect::new(10, 10, 40, 40));
    }

    #[test]
    fn test_crop_region_clamps_to_frame() {
        let rect = crop_region(&BoundingBox::new(-5, 80, 150, 120), 100, 100).unwrap();
        assert_eq!(rect, Rect::new(0, 80, 100, 20));

        assert!(crop_region(&BoundingBox::new(120, 10, 150, 50), 100, 100).is_none());
        assert!(crop_region(&BoundingBox::new(50, 50, 10, 10), 100, 100).is_none());
        assert!(crop_region(&BoundingBox::new(10, 10, 10, 50), 100, 100).is_none());
    }

    #[test]
    fn test_write_crops_and_overwrites() {
        let root = std::env::temp_dir().join("annocrop_test_crop_writer");
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("waving")).unwrap();

        let frame =
            Mat::new_rows_cols_with_default(100, 100, CV_8UC3, Scalar::new(30.0, 60.0, 90.0, 0.0))
                .unwrap();
        let w = writer(&root, OcclusionMode::SaveOnly);
        let rec = record(Some("waving"), false);

        let first = w.write(&frame, &rec, "clip", 4).unwrap();
        let second = w.write(&frame, &rec, "clip", 4).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, root.join("waving").join("clip_waving_frame00004.jpg"));

        let saved = imgcodecs::imread(&first.to_string_lossy(), imgcodecs::IMREAD_COLOR).unwrap();
        assert_eq!((saved.cols(), saved.rows()), (40, 40));
    }

    #[test]
    fn test_write_out_of_frame_box_is_crop_error() {
        let root = std::env::temp_dir().join("annocrop_test_crop_writer_empty");
        let frame = Mat::new_rows_cols_with_default(20, 20, CV_8UC3, Scalar::all(0.0)).unwrap();
        let w = writer(&root, OcclusionMode::None);
        let mut rec = record(Some("waving"), false);
        rec.bbox = BoundingBox::new(40, 40, 80, 80);

        assert!(matches!(
            w.write(&frame, &rec, "clip", 0),
            Err(CropError::EmptyRegion { width: 20, height: 20, .. })
        ));
    }

    #[test]
    fn test_write_into_missing_folder_fails_cleanly() {
        let root = std::env::temp_dir().join("annocrop_test_crop_writer_no_folders");
        let _ = fs::remove_dir_all(&root);
        let frame = Mat::new_rows_cols_with_default(100, 100, CV_8UC3, Scalar::all(0.0)).unwrap();
        let w = writer(&root, OcclusionMode::None);

        assert!(w.write(&frame, &record(Some("waving"), false), "clip", 0).is_err());
    }
}

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::crop_writer::CropWriter;
use crate::annotation::AnnotationIndex;
use crate::config::{DatasetConfig, OcclusionMode};
use crate::decoder::{FrameCursor, FrameSource, VideoDecoder};
use crate::sampling::SamplingPolicy;
use crate::utils::{file_utils, logger};

/// Everything a job needs besides the video path. Shared read-only by all workers.
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub config: Arc<DatasetConfig>,
    pub output_root: PathBuf,
    pub annotation_dir: PathBuf,
    pub annotation_ext: String,
    pub image_ext: String,
    pub subject_label: String,
    pub mode: OcclusionMode,
    /// Pair annotation frame N with decoded image N+1, as older datasets did.
    pub legacy_frame_skew: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Completed,
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub video: PathBuf,
    pub identity: String,
    #[serde(flatten)]
    pub status: JobStatus,
    pub frames_decoded: u64,
    pub frames_sampled: u64,
    pub crops_written: u64,
    pub crop_failures: u64,
    pub malformed_entries: usize,
}

impl JobReport {
    fn new(video: &Path, identity: &str) -> Self {
        Self {
            video: video.to_path_buf(),
            identity: identity.to_string(),
            status: JobStatus::Completed,
            frames_decoded: 0,
            frames_sampled: 0,
            crops_written: 0,
            crop_failures: 0,
            malformed_entries: 0,
        }
    }

    fn skipped(mut self, reason: String) -> Self {
        logger::warn(&format!("skipping {}: {}", self.video.display(), reason));
        self.status = JobStatus::Skipped { reason };
        self
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, JobStatus::Skipped { .. })
    }
}

/// Runs one video from annotation lookup to the last crop.
pub struct VideoJob {
    settings: Arc<JobSettings>,
    writer: CropWriter,
}

impl VideoJob {
    pub fn new(settings: Arc<JobSettings>) -> Self {
        let writer = CropWriter::new(
            &settings.output_root,
            Arc::clone(&settings.config),
            settings.mode,
            &settings.image_ext,
        );
        Self { settings, writer }
    }

    pub fn run(&self, video: &Path) -> JobReport {
        let identity = file_utils::video_identity(video);
        let mut report = JobReport::new(video, &identity);

        let annotation_path = file_utils::annotation_path_for(
            video,
            &self.settings.annotation_dir,
            &self.settings.annotation_ext,
        );
        let index = match AnnotationIndex::from_file(&annotation_path, &self.settings.subject_label) {
            Ok(index) => index,
            Err(e) => return report.skipped(e.to_string()),
        };
        report.malformed_entries = index.malformed_entries();
        logger::debug(&format!(
            "{}: {} records over {} frames (last {:?}), {} dropped",
            identity,
            index.record_count(),
            index.frame_count(),
            index.last_frame(),
            index.malformed_entries()
        ));

        // Released when dropped at the end of this call, however decoding ends
        let mut decoder = match VideoDecoder::open(video) {
            Ok(decoder) => decoder,
            Err(e) => return report.skipped(e.to_string()),
        };

        self.process(&mut decoder, &index, report)
    }

    pub fn process<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        index: &AnnotationIndex,
        mut report: JobReport,
    ) -> JobReport {
        let policy = SamplingPolicy::new(&self.settings.config.rules);
        let mode = self.settings.mode;
        let mut cursor = FrameCursor::new(source, self.settings.legacy_frame_skew);

        for frame in cursor.by_ref() {
            let records = index.records_at(frame.index);
            if !policy.should_sample(records, frame.index, mode) || records.is_empty() {
                continue;
            }
            report.frames_sampled += 1;

            for record in records {
                match self.writer.write(&frame.image, record, &report.identity, frame.index) {
                    Ok(_) => report.crops_written += 1,
                    Err(e) => {
                        report.crop_failures += 1;
                        logger::error(&format!(
                            "{} frame {} track {}: {}",
                            report.identity, frame.index, record.track_id, e
                        ));
                    }
                }
            }
        }

        report.frames_decoded = cursor.position();
        logger::info(&format!(
            "{}: {} frames, {} sampled, {} crops, {} failed",
            report.identity,
            report.frames_decoded,
            report.frames_sampled,
            report.crops_written,
            report.crop_failures
        ));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::OutputLayout;
    use crate::decoder::video::tests::SyntheticSource;
    use std::fs;

    fn settings(name: &str, mode: OcclusionMode, legacy_frame_skew: bool) -> Arc<JobSettings> {
        let base = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&base);
        let output_root = base.join("out");
        let annotation_dir = base.join("annotations");
        fs::create_dir_all(&annotation_dir).unwrap();

        let config = Arc::new(DatasetConfig::default());
        OutputLayout::plan(&output_root, &config.labels, mode)
            .materialize()
            .unwrap();

        Arc::new(JobSettings {
            config,
            output_root,
            annotation_dir,
            annotation_ext: "json".to_string(),
            image_ext: "jpg".to_string(),
            subject_label: "person".to_string(),
            mode,
            legacy_frame_skew,
        })
    }

    fn single_track(frames: u64, behavior: &str, occluded_frames: &[u64]) -> String {
        let boxes: Vec<String> = (0..frames)
            .map(|frame| {
                format!(
                    r#"{{ "frame": {}, "xtl": 2, "ytl": 2, "xbr": 12, "ybr": 10,
                         "occluded": "{}", "attributes": {{ "behavior": "{}" }} }}"#,
                    frame,
                    if occluded_frames.contains(&frame) { 1 } else { 0 },
                    behavior
                )
            })
            .collect();
        format!(
            r#"{{ "tracks": [ {{ "id": 0, "label": "person", "boxes": [{}] }} ] }}"#,
            boxes.join(",")
        )
    }

    fn listed(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    #[test]
    fn test_waving_subject_sampled_every_third_frame() {
        let settings = settings("annocrop_test_job_waving", OcclusionMode::None, false);
        let index = AnnotationIndex::from_str(&single_track(10, "waving", &[]), "person").unwrap();
        let job = VideoJob::new(Arc::clone(&settings));
        let mut source = SyntheticSource::new(32, 24, 10);

        let report = job.process(&mut source, &index, JobReport::new(Path::new("clip.mp4"), "clip"));

        assert_eq!(report.status, JobStatus::Completed);
        assert_eq!(report.frames_decoded, 10);
        assert_eq!(report.frames_sampled, 4);
        assert_eq!(report.crops_written, 4);
        assert_eq!(
            listed(&settings.output_root.join("waving")),
            vec![
                "clip_waving_frame00000.jpg",
                "clip_waving_frame00003.jpg",
                "clip_waving_frame00006.jpg",
                "clip_waving_frame00009.jpg",
            ]
        );
    }

    #[test]
    fn test_legacy_skew_drops_first_image() {
        let settings = settings("annocrop_test_job_skew", OcclusionMode::None, true);
        let index = AnnotationIndex::from_str(&single_track(10, "waving", &[]), "person").unwrap();
        let job = VideoJob::new(Arc::clone(&settings));
        let mut source = SyntheticSource::new(32, 24, 10);

        let report = job.process(&mut source, &index, JobReport::new(Path::new("clip.mp4"), "clip"));

        assert_eq!(report.frames_decoded, 9);
        assert_eq!(report.crops_written, 3);
        assert_eq!(source.produced, 10);
    }

    #[test]
    fn test_occluded_frames_routed_to_own_bucket() {
        let settings = settings("annocrop_test_job_occluded", OcclusionMode::SaveOnly, false);
        let index = AnnotationIndex::from_str(
            &single_track(15, "waving", &[6, 7, 8, 14]),
            "person",
        )
        .unwrap();
        let job = VideoJob::new(Arc::clone(&settings));
        let mut source = SyntheticSource::new(32, 24, 15);

        job.process(&mut source, &index, JobReport::new(Path::new("clip.mp4"), "clip"));

        // Occluded frames 6, 8 fall off the period-7 grid; 7 and 14 land on it.
        assert_eq!(
            listed(&settings.output_root.join("occluded")),
            vec!["clip_waving_occluded_frame00007.jpg", "clip_waving_occluded_frame00014.jpg"]
        );
        assert_eq!(
            listed(&settings.output_root.join("waving")),
            vec![
                "clip_waving_frame00000.jpg",
                "clip_waving_frame00003.jpg",
                "clip_waving_frame00009.jpg",
                "clip_waving_frame00012.jpg",
            ]
        );
    }

    #[test]
    fn test_bad_box_does_not_block_siblings() {
        let settings = settings("annocrop_test_job_siblings", OcclusionMode::None, false);
        let index = AnnotationIndex::from_str(
            r#"{ "tracks": [
                { "id": 0, "label": "person", "boxes": [
                    { "frame": 0, "xtl": 500, "ytl": 500, "xbr": 600, "ybr": 600 } ] },
                { "id": 1, "label": "person", "boxes": [
                    { "frame": 0, "xtl": 0, "ytl": 0, "xbr": 8, "ybr": 8,
                      "attributes": { "behavior": "neutral" } } ] }
            ] }"#,
            "person",
        )
        .unwrap();
        let job = VideoJob::new(Arc::clone(&settings));
        let mut source = SyntheticSource::new(32, 24, 3);

        let report = job.process(&mut source, &index, JobReport::new(Path::new("clip.mp4"), "clip"));

        assert_eq!(report.crop_failures, 1);
        assert_eq!(report.crops_written, 1);
        assert_eq!(
            listed(&settings.output_root.join("neutral")),
            vec!["clip_neutral_frame00000.jpg"]
        );
    }

    #[test]
    fn test_missing_annotation_skips_video() {
        let settings = settings("annocrop_test_job_missing", OcclusionMode::SaveOnly, false);
        let job = VideoJob::new(Arc::clone(&settings));

        let report = job.run(Path::new("/nonexistent/videos/lonely.mp4"));

        assert!(report.is_skipped());
        assert_eq!(report.crops_written, 0);
        assert_eq!(report.frames_decoded, 0);
        for folder in ["waving", "other", "occluded"] {
            assert!(listed(&settings.output_root.join(folder)).is_empty());
        }
    }

    #[test]
    fn test_unopenable_video_skips() {
        let settings = settings("annocrop_test_job_unopenable", OcclusionMode::None, false);
        fs::write(
            settings.annotation_dir.join("broken.json"),
            single_track(3, "waving", &[]),
        )
        .unwrap();
        let video = settings.annotation_dir.join("broken.mp4");
        let job = VideoJob::new(Arc::clone(&settings));

        let report = job.run(&video);

        assert!(report.is_skipped());
        assert_eq!(report.crops_written, 0);
    }
}

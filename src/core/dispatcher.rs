use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::layout::OutputLayout;
use super::video_job::{JobReport, JobSettings, JobStatus, VideoJob};
use crate::config::OcclusionMode;
use crate::shared::constants;
use crate::utils::{file_utils, logger};

/// What a whole run produced; written to `summary.json` in the output root.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub output_root: PathBuf,
    pub occlusion_mode: OcclusionMode,
    pub workers: usize,
    pub videos: usize,
    pub skipped: usize,
    /// Jobs that never reported back (a worker panicked).
    pub lost: usize,
    pub crops_written: u64,
    pub crop_failures: u64,
    pub jobs: Vec<JobReport>,
}

pub fn discover_videos(dir: &Path) -> Result<Vec<PathBuf>> {
    file_utils::list_files(dir, constants::VIDEO_EXTENSIONS)
}

/// Fans one [`VideoJob`] per video out over a fixed pool of workers.
pub struct JobDispatcher {
    settings: Arc<JobSettings>,
    workers: usize,
}

impl JobDispatcher {
    pub fn new(settings: JobSettings, workers: usize) -> Self {
        Self {
            settings: Arc::new(settings),
            workers: workers.max(1),
        }
    }

    pub fn run(&self, videos: Vec<PathBuf>) -> Result<RunSummary> {
        let started_at = Local::now();
        let total = videos.len();

        // Every folder exists before the first worker writes
        let layout = OutputLayout::plan(
            &self.settings.output_root,
            &self.settings.config.labels,
            self.settings.mode,
        );
        layout.materialize()?;
        logger::info(&format!(
            "dispatching {} videos to {} workers, folders: {}",
            total,
            self.workers,
            layout.folders().collect::<Vec<_>>().join(", ")
        ));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("{}-worker-{}", constants::APP_NAME, i))
            .panic_handler(|_| logger::error("video job panicked; its report is lost"))
            .build()
            .context("Failed to build worker pool")?;

        let (sender, receiver) = crossbeam_channel::unbounded::<JobReport>();
        for video in videos {
            let sender = sender.clone();
            let settings = Arc::clone(&self.settings);
            pool.spawn(move || {
                let report = VideoJob::new(settings).run(&video);
                let _ = sender.send(report);
            });
        }
        drop(sender);

        let progress = progress_bar(total as u64)?;
        let mut jobs = Vec::with_capacity(total);
        for report in receiver.iter() {
            if let JobStatus::Skipped { reason } = &report.status {
                progress.println(format!("⚠️  skipped {}: {}", report.video.display(), reason));
            }
            progress.set_message(report.identity.clone());
            progress.inc(1);
            jobs.push(report);
        }
        progress.finish_with_message("done");

        jobs.sort_by(|a, b| a.video.cmp(&b.video));
        let summary = RunSummary {
            started_at,
            finished_at: Local::now(),
            output_root: self.settings.output_root.clone(),
            occlusion_mode: self.settings.mode,
            workers: self.workers,
            videos: total,
            skipped: jobs.iter().filter(|job| job.is_skipped()).count(),
            lost: total - jobs.len(),
            crops_written: jobs.iter().map(|job| job.crops_written).sum(),
            crop_failures: jobs.iter().map(|job| job.crop_failures).sum(),
            jobs,
        };

        write_summary(&self.settings.output_root, &summary)?;
        Ok(summary)
    }
}

fn progress_bar(total: u64) -> Result<ProgressBar> {
    let progress = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} videos | {msg}")?
        .progress_chars("#>-");
    progress.set_style(style);
    Ok(progress)
}

fn write_summary(root: &Path, summary: &RunSummary) -> Result<()> {
    let path = root.join(constants::SUMMARY_FILE);
    let file = File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)?;
    Ok(())
}

mod annotation;
mod config;
mod core;
mod decoder;
mod error;
mod sampling;
mod shared;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{DatasetConfig, OcclusionMode};
use crate::core::dispatcher::{self, JobDispatcher};
use crate::core::JobSettings;
use crate::shared::constants;
use crate::utils::logger;

#[derive(Parser)]
#[command(author, version, about = "Cut annotated subjects out of videos into a labeled image dataset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract subject crops from every annotated video in a directory
    Extract {
        #[arg(short, long)]
        videos: PathBuf,
        #[arg(short, long)]
        annotations: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// JSON file with sampling periods and label folders
        #[arg(short, long)]
        rules: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OcclusionMode::None)]
        occlusion: OcclusionMode,
        /// Parallel workers, one video each (default: CPU count)
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
        workers: Option<u16>,
        #[arg(long, default_value = constants::DEFAULT_SUBJECT_LABEL)]
        subject_label: String,
        #[arg(long, default_value = constants::DEFAULT_ANNOTATION_EXTENSION)]
        annotation_ext: String,
        #[arg(long, default_value = constants::DEFAULT_IMAGE_EXTENSION)]
        image_ext: String,
        #[arg(long, default_value_t = false, help = "Pair annotation frame N with decoded image N+1, matching datasets built before the alignment fix")]
        legacy_frame_skew: bool,
    },
    /// Print the effective sampling periods and label folders as JSON
    PrintRules {
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            videos,
            annotations,
            output,
            rules,
            occlusion,
            workers,
            subject_label,
            annotation_ext,
            image_ext,
            legacy_frame_skew,
        } => {
            std::fs::create_dir_all(&output)
                .with_context(|| format!("Failed to create output root: {}", output.display()))?;
            logger::init(&output);

            let config = Arc::new(DatasetConfig::load(rules.as_deref())?);
            let workers = workers.map_or_else(num_cpus::get, usize::from);
            logger::info(&format!(
                "extract: videos={} annotations={} output={} occlusion={:?} workers={} skew={}",
                videos.display(),
                annotations.display(),
                output.display(),
                occlusion,
                workers,
                legacy_frame_skew
            ));

            let settings = JobSettings {
                config,
                output_root: output,
                annotation_dir: annotations,
                annotation_ext,
                image_ext,
                subject_label,
                mode: occlusion,
                legacy_frame_skew,
            };

            let videos = dispatcher::discover_videos(&videos)?;
            println!("Found {} videos, using {} workers", videos.len(), workers);

            let summary = JobDispatcher::new(settings, workers).run(videos)?;
            println!(
                "Wrote {} crops from {} videos ({} skipped, {} crop failures) into {}",
                summary.crops_written,
                summary.videos - summary.skipped - summary.lost,
                summary.skipped,
                summary.crop_failures,
                summary.output_root.display()
            );
            if summary.lost > 0 {
                eprintln!("{} videos did not finish; see {}", summary.lost, constants::ERROR_LOG_FILE);
            }
        }
        Commands::PrintRules { rules } => {
            let config = DatasetConfig::load(rules.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

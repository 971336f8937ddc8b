//! Face and eye detection over a sequence of still frames.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use face_eye_detect::{
    config::Config,
    controls::FaceSizePreset,
    detector::loader::DEFAULT_LOAD_TIMEOUT,
    frame::Frame,
    pipeline::FramePipeline,
    session::Mode,
};
use log::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Frames to process, in order
    #[arg(required = true)]
    frames: Vec<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Directory receiving the annotated frames
    #[arg(short, long, default_value = "annotated")]
    output_dir: PathBuf,

    /// Detection mode at start (cascade, tracked)
    #[arg(short, long)]
    mode: Option<Mode>,

    /// Minimum face size as a percentage of frame height (50, 40, 30, 20)
    #[arg(short, long)]
    face_size: Option<u32>,

    /// Toggle the detection mode before this zero-based frame
    #[arg(long)]
    toggle_mode_at: Option<usize>,

    /// Seed for the pupil generator
    #[arg(short, long)]
    seed: Option<u64>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    if let Some(mode) = args.mode {
        config.detection.mode = mode;
    }
    if let Some(percent) = args.face_size {
        config.detection.relative_face_size = FaceSizePreset::from_percent(percent)?.fraction();
    }
    if args.seed.is_some() {
        config.overlay.seed = args.seed;
    }

    config.validate()?;
    Ok(config)
}

fn output_path(output_dir: &Path, input: &Path, index: usize) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| format!("frame_{index:05}"), |stem| stem.to_string_lossy().into_owned());
    output_dir.join(format!("{stem}.png"))
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Face and eye detection ({})", env!("BUILD_TARGET"));

    let config = load_config(&args)?;
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Cannot create output directory {}", args.output_dir.display()))?;

    let mut pipeline = FramePipeline::from_config(&config)?;
    pipeline.session_mut().wait_for_slots(DEFAULT_LOAD_TIMEOUT);
    let controls = pipeline.control_handle();

    let started = Instant::now();
    let mut written = 0usize;
    for (index, path) in args.frames.iter().enumerate() {
        if args.toggle_mode_at == Some(index) {
            controls.toggle_mode()?;
        }

        let frame = match Frame::open(path) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let annotated = pipeline.process_frame(frame);
        let target = output_path(&args.output_dir, path, index);
        annotated
            .save(&target)
            .with_context(|| format!("Cannot write {}", target.display()))?;
        written += 1;

        if let Some(report) = pipeline.last_report() {
            info!(
                "{} -> {}: {} faces, {} eyes ({} mode)",
                path.display(),
                target.display(),
                report.faces,
                report.eyes,
                report.mode
            );
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    if elapsed > 0.0 {
        #[allow(clippy::cast_precision_loss)]
        let fps = written as f64 / elapsed;
        info!("Processed {written} frames in {elapsed:.2}s ({fps:.1} frames/s)");
    }

    pipeline.shutdown();
    Ok(())
}

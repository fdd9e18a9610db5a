// Command-line front end: runs edge detection on one or more 24-bit bitmaps.
//
// A single input without `--jobs` is processed in place on the main thread and
// can also produce an RGB-565 preview PNG. Several inputs (or `--jobs`) go
// through the parallel batch runner, with `--output` and `--grayscale-dump`
// naming directories instead of files.

use anyhow::{Context, Result, bail};
use clap::Parser;
use edge_vision::config::{AppConfig, load_config};
use edge_vision::core_modules::grayscale::to_grayscale;
use edge_vision::core_modules::isolation_pruner::PruneNeighborhood;
use edge_vision::core_modules::picture::{Flip, bitmap_codec};
use edge_vision::core_modules::render::FrameBufferSurface;
use edge_vision::core_modules::utils::image_helper::image_helper;
use edge_vision::parallel_pipeline::{BatchJob, ParallelPipeline};
use edge_vision::pipeline::EdgePipeline;
use log::{info, warn};
use std::collections::HashMap;
use std::path::PathBuf;

/// Sobel edge detection for uncompressed 24-bit bitmaps
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Bitmap file(s) to process
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON file with `pipeline` and `render` sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the edge map (a directory when several inputs are given)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Where to write the grayscale intermediate (a directory in batch mode)
    #[arg(long)]
    grayscale_dump: Option<PathBuf>,

    /// Show the flipped input and its edge map on the configured screen; save the last frame as PNG
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Use the legacy pruning neighbourhood (east twice, no south-east)
    #[arg(long)]
    legacy_prune: bool,

    /// Mirror applied to the preview, overriding the config file
    #[arg(long, value_enum)]
    flip: Option<Flip>,

    /// Number of pictures processed concurrently
    #[arg(short, long)]
    jobs: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = resolve_config(&args)?;

    if args.inputs.len() == 1 && args.jobs.is_none() {
        run_single(&args, &config)
    } else {
        run_batch(&args, &config).await
    }
}

fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if args.legacy_prune {
        config.pipeline.prune_neighborhood = PruneNeighborhood::Legacy;
    }
    if let Some(flip) = args.flip {
        config.render.flip = flip;
    }
    Ok(config)
}

fn run_single(args: &Args, config: &AppConfig) -> Result<()> {
    let input = &args.inputs[0];
    let picture = bitmap_codec::decode(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    if let Some(path) = &args.grayscale_dump {
        bitmap_codec::encode_grayscale(path, picture.header(), &to_grayscale(&picture))
            .context("Failed to write grayscale dump")?;
        info!("grayscale written to {}", path.display());
    }

    let pipeline = EdgePipeline::new(config.pipeline.clone());
    let report = pipeline
        .generate_report(&picture)
        .with_context(|| format!("Edge detection failed on {}", input.display()))?;
    info!(
        "TIME ELAPSED: {} ms ({} edge pixels)",
        report.elapsed.as_millis(),
        report.edge_pixel_count()
    );

    if let Some(path) = &args.output {
        bitmap_codec::encode_picture(path, &report.picture).context("Failed to write output bitmap")?;
        info!("edges written to {}", path.display());
    }

    if let Some(path) = &args.preview {
        let mut surface = FrameBufferSurface::new(config.render.screen_width, config.render.screen_height);
        pipeline
            .preview(&mut surface, &picture, config.render.flip)
            .context("Failed to render preview")?;
        image_helper::save_surface(path, &surface).context("Failed to write preview")?;
        info!("preview written to {}", path.display());
    }

    Ok(())
}

async fn run_batch(args: &Args, config: &AppConfig) -> Result<()> {
    if args.preview.is_some() {
        warn!("--preview is only available for a single input; ignoring it");
    }
    for dir in [&args.output, &args.grayscale_dump].into_iter().flatten() {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let stems = output_stems(&args.inputs);
    let jobs = args
        .inputs
        .iter()
        .zip(&stems)
        .map(|(input, stem)| BatchJob {
            input: input.clone(),
            output: args.output.as_ref().map(|dir| dir.join(format!("{stem}_edges.bmp"))),
            grayscale_dump: args.grayscale_dump.as_ref().map(|dir| dir.join(format!("{stem}_gray.bmp"))),
        })
        .collect();

    let pipeline = ParallelPipeline::new(config.pipeline.clone(), args.jobs);
    let results = pipeline.process(jobs).await;

    let mut failures = 0;
    for result in &results {
        match result {
            Ok(outcome) => info!(
                "{}: {}x{}, {} edge pixels, {} ms",
                outcome.input.display(),
                outcome.width,
                outcome.height,
                outcome.edge_pixels,
                outcome.elapsed.as_millis()
            ),
            Err(_) => failures += 1,
        }
    }
    if failures > 0 {
        bail!("{failures} of {} picture(s) failed", results.len());
    }
    Ok(())
}

/// File-name stems for batch outputs. Inputs that share a stem (`a/img.bmp`,
/// `b/img.bmp`) get their position appended so no output overwrites another.
fn output_stems(inputs: &[PathBuf]) -> Vec<String> {
    let stems: Vec<String> = inputs
        .iter()
        .map(|input| {
            input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "picture".to_string())
        })
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for stem in &stems {
        *counts.entry(stem.as_str()).or_default() += 1;
    }

    stems
        .iter()
        .enumerate()
        .map(|(i, stem)| {
            if counts[stem.as_str()] > 1 {
                format!("{stem}_{i}")
            } else {
                stem.clone()
            }
        })
        .collect()
}

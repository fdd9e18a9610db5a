// THEORY:
// The `pipeline` module is the top-level API of the edge-detection engine. It runs
// the five stages in a fixed order on one picture:
//
//     grayscale -> Gaussian blur -> Sobel gradient -> non-maximum suppression
//               -> isolation pruning
//
// and writes the final luminance back into a byte picture that shares the input
// picture's header. Each stage fully consumes its input before the next starts.
// Nothing is retried: the work is deterministic, so a failure on one attempt is
// a failure on every attempt.

use crate::core_modules::convolution::{BorderPolicy, Kernel, convolve};
use crate::core_modules::error::Result;
use crate::core_modules::gradient::{Gradient, gradient};
use crate::core_modules::grayscale::to_grayscale;
use crate::core_modules::isolation_pruner::{PruneNeighborhood, STRONG_PIXEL_THRESHOLD, prune};
use crate::core_modules::non_max_suppression::suppress;
use crate::core_modules::picture::{Flip, Picture};
use crate::core_modules::pixel::pixel::Pixel;
use crate::core_modules::render::{RenderSurface, draw_picture};
use log::{debug, info};
use serde::Deserialize;
use std::time::{Duration, Instant};

// Re-export key data structures for the public API.
pub use crate::core_modules::error::VisionError;
pub use crate::core_modules::gradient::GradientDirection;

/// Configuration for the EdgePipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pixels at or below this value are zeroed by the pruning stage.
    pub strong_pixel_threshold: f64,
    /// Which neighbours count as support when pruning isolated pixels.
    pub prune_neighborhood: PruneNeighborhood,
    /// How convolution treats kernel taps outside the image.
    pub border_policy: BorderPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strong_pixel_threshold: STRONG_PIXEL_THRESHOLD,
            prune_neighborhood: PruneNeighborhood::Full,
            border_policy: BorderPolicy::SkipOutOfBounds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Grayscale,
    GaussianBlur,
    Gradient,
    NonMaximumSuppression,
    IsolationPruning,
    WriteBack,
}

#[derive(Debug, Clone, Copy)]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed: Duration,
}

/// The result of running the pipeline on one picture.
#[derive(Debug, Clone)]
pub struct EdgeReport {
    pub picture: Picture,
    pub stage_timings: Vec<StageTiming>,
    pub elapsed: Duration,
}

impl EdgeReport {
    /// Number of pixels that survived as edges.
    pub fn edge_pixel_count(&self) -> usize {
        self.picture.pixels().iter().filter(|p| p.red != 0).count()
    }
}

/// The main, top-level struct for the edge-detection engine.
#[derive(Debug, Clone, Default)]
pub struct EdgePipeline {
    config: PipelineConfig,
}

impl EdgePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the whole pipeline and returns only the resulting picture.
    pub fn edge_detect(&self, picture: &Picture) -> Result<Picture> {
        Ok(self.generate_report(picture)?.picture)
    }

    pub fn generate_report(&self, picture: &Picture) -> Result<EdgeReport> {
        let started = Instant::now();
        let mut stage_timings = Vec::with_capacity(6);
        let mut timed = |stage: Stage, since: Instant| {
            let elapsed = since.elapsed();
            debug!("{}: {:?} took {:.3} ms", picture.file_name(), stage, elapsed.as_secs_f64() * 1000.0);
            stage_timings.push(StageTiming { stage, elapsed });
        };

        // Stage 1: Luminance
        let stage_start = Instant::now();
        let luminance = to_grayscale(picture);
        timed(Stage::Grayscale, stage_start);

        // Stage 2: Smoothing
        let stage_start = Instant::now();
        let blurred = convolve(&Kernel::gaussian_5x5(), &luminance, self.config.border_policy)?;
        drop(luminance);
        timed(Stage::GaussianBlur, stage_start);

        // Stage 3: Edge strength and orientation
        let stage_start = Instant::now();
        let Gradient {
            magnitude,
            direction,
        } = gradient(blurred, self.config.border_policy)?;
        timed(Stage::Gradient, stage_start);

        // Stage 4: Thinning
        let stage_start = Instant::now();
        let thinned = suppress(magnitude, &direction)?;
        drop(direction);
        timed(Stage::NonMaximumSuppression, stage_start);

        // Stage 5: Final thresholding
        let stage_start = Instant::now();
        let edges = prune(
            thinned,
            self.config.strong_pixel_threshold,
            self.config.prune_neighborhood,
        );
        timed(Stage::IsolationPruning, stage_start);

        // Stage 6: Back to bytes, sharing the original header
        let stage_start = Instant::now();
        let result = picture.with_pixels(edges.map(Pixel::from_luma))?;
        timed(Stage::WriteBack, stage_start);

        let elapsed = started.elapsed();
        info!(
            "{}: edge detection on {}x{} took {} ms",
            picture.file_name(),
            picture.width(),
            picture.height(),
            elapsed.as_millis()
        );

        Ok(EdgeReport {
            picture: result,
            stage_timings,
            elapsed,
        })
    }

    /// Drives a display the way the board does: the decoded picture is flipped
    /// and shown, then the *flipped* picture is edge-detected and shown. Because
    /// the thinning stages work in raster order, this is not the same as
    /// flipping the result of `edge_detect`.
    pub fn preview<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        picture: &Picture,
        flip: Flip,
    ) -> Result<EdgeReport> {
        let shown = picture.flipped(flip)?;
        draw_picture(surface, &shown);

        let report = self.generate_report(&shown)?;
        draw_picture(surface, &report.picture);
        Ok(report)
    }
}

/// Runs the pipeline with the default configuration.
pub fn edge_detect(picture: &Picture) -> Result<Picture> {
    EdgePipeline::default().edge_detect(picture)
}

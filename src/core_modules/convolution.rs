// THEORY:
// Generic 2D convolution over a luminance buffer. Every output pixel is
//
//     sum over taps (m, n) of  input[i + m - cy][j + n - cx] * kernel[rows-1-m][cols-1-n]
//
// divided by a fixed scaling factor. The kernel is read flipped, so this is a
// true convolution rather than a correlation (it matters for the antisymmetric
// Sobel kernels).
//
// Border handling is a named strategy:
// - `SkipOutOfBounds` (default): taps that fall outside the image contribute
//   nothing, yet the sum is still divided by the full scaling factor. Border
//   pixels come out darker than interior pixels. Downstream thresholds were
//   tuned against this behaviour, so it stays the default.
// - `ClampToEdge`: out-of-range taps read the nearest edge pixel instead, which
//   keeps a constant image constant all the way to the border.

use crate::core_modules::pixel_buffer::LumaBuffer;
use crate::core_modules::error::Result;

/// A small, dense, row-major weight matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    rows: usize,
    cols: usize,
    weights: Vec<f64>,
    scaling_factor: f64,
}

impl Kernel {
    /// Both sides must be odd so that the kernel has a centre tap.
    fn from_rows<const R: usize, const C: usize>(rows: [[f64; C]; R], scaling_factor: f64) -> Self {
        const { assert!(R % 2 == 1 && C % 2 == 1, "kernel sides must be odd") };
        Self {
            rows: R,
            cols: C,
            weights: rows.iter().flatten().copied().collect(),
            scaling_factor,
        }
    }

    /// The 5x5 smoothing kernel, normalised by 159.
    pub fn gaussian_5x5() -> Self {
        Self::from_rows(
            [
                [2.0, 4.0, 5.0, 4.0, 2.0],
                [4.0, 9.0, 12.0, 9.0, 4.0],
                [5.0, 12.0, 15.0, 12.0, 5.0],
                [4.0, 9.0, 12.0, 9.0, 4.0],
                [2.0, 4.0, 5.0, 4.0, 2.0],
            ],
            159.0,
        )
    }

    /// Horizontal Sobel derivative.
    pub fn sobel_horizontal() -> Self {
        Self::from_rows(
            [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]],
            1.0,
        )
    }

    /// Vertical Sobel derivative.
    pub fn sobel_vertical() -> Self {
        Self::from_rows(
            [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]],
            1.0,
        )
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn scaling_factor(&self) -> f64 {
        self.scaling_factor
    }

    #[inline]
    fn weight(&self, row: usize, col: usize) -> f64 {
        self.weights[row * self.cols + col]
    }
}

/// What a kernel tap sees when it lands outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderPolicy {
    /// The tap is dropped; the divisor is not adjusted.
    #[default]
    SkipOutOfBounds,
    /// The tap reads the nearest in-bounds pixel.
    ClampToEdge,
}

/// Convolves `input` with `kernel` and returns a new buffer of the same shape
/// with the result in all three channels.
pub fn convolve(kernel: &Kernel, input: &LumaBuffer, border: BorderPolicy) -> Result<LumaBuffer> {
    let (width, height) = (input.width() as isize, input.height() as isize);
    let center_x = (kernel.cols / 2) as isize;
    let center_y = (kernel.rows / 2) as isize;
    let output = LumaBuffer::new(input.width(), input.height())?;

    for i in 0..height {
        for j in 0..width {
            let mut sum = 0.0;
            for m in 0..kernel.rows {
                let flipped_m = kernel.rows - 1 - m;
                let ii = i + m as isize - center_y;
                for n in 0..kernel.cols {
                    let flipped_n = kernel.cols - 1 - n;
                    let jj = j + n as isize - center_x;

                    let sample = match border {
                        BorderPolicy::SkipOutOfBounds => match input.checked_get(jj, ii) {
                            Some(pixel) => pixel.luminance(),
                            None => continue,
                        },
                        BorderPolicy::ClampToEdge => input.luma(
                            jj.clamp(0, width - 1) as usize,
                            ii.clamp(0, height - 1) as usize,
                        ),
                    };
                    sum += sample * kernel.weight(flipped_m, flipped_n);
                }
            }
            output.set_luma(j as usize, i as usize, sum / kernel.scaling_factor);
        }
    }

    Ok(output)
}

// THEORY:
// The gradient stage runs both Sobel kernels over the blurred image and reduces
// the pair of responses (cx, cy) at each pixel to
//
// - a magnitude, `|cx| / 2 + |cy| / 2` (an L1-style estimate, not the Euclidean
//   norm), and
// - a direction quantized to one of four edge orientations.
//
// Quantization works on whole degrees: `atan2(cy, cx)` is converted to degrees,
// truncated toward zero, wrapped into [0, 180) and snapped to the nearest of
// {0, 45, 90, 135, 180} by squared distance. The scan only moves to a later
// reference angle when it is strictly closer, so ties go to the smaller angle.
// 180 folds back to 0.
//
// The magnitude is written back into the storage of the blurred buffer the stage
// consumed, once both convolutions have read it. Directions are stored in a
// luminance buffer as their degree value so every intermediate has one type.

use crate::core_modules::convolution::{BorderPolicy, Kernel, convolve};
use crate::core_modules::error::Result;
use crate::core_modules::pixel::pixel::LumaPixel;
use crate::core_modules::pixel_buffer::LumaBuffer;

const REFERENCE_ANGLES: [i32; 5] = [0, 45, 90, 135, 180];
const HALF_TURN: i32 = 180;
const MAGNITUDE_AVERAGING: f64 = 2.0;

/// Quantized edge-normal orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradientDirection {
    Deg0,
    Deg45,
    Deg90,
    Deg135,
}

impl GradientDirection {
    pub fn degrees(self) -> u16 {
        match self {
            GradientDirection::Deg0 => 0,
            GradientDirection::Deg45 => 45,
            GradientDirection::Deg90 => 90,
            GradientDirection::Deg135 => 135,
        }
    }

    /// Reads a direction back out of a direction buffer value. Anything other
    /// than an exact reference angle yields `None`.
    pub fn from_degrees(value: f64) -> Option<Self> {
        match value {
            v if v == 0.0 => Some(GradientDirection::Deg0),
            v if v == 45.0 => Some(GradientDirection::Deg45),
            v if v == 90.0 => Some(GradientDirection::Deg90),
            v if v == 135.0 => Some(GradientDirection::Deg135),
            _ => None,
        }
    }

    /// Offsets `(dx, dy)` of the two neighbours lying along this direction.
    /// `dy` grows downward (south).
    pub fn neighbor_offsets(self) -> [(isize, isize); 2] {
        match self {
            GradientDirection::Deg0 => [(-1, 0), (1, 0)],
            GradientDirection::Deg90 => [(0, 1), (0, -1)],
            GradientDirection::Deg45 => [(-1, -1), (1, 1)],
            GradientDirection::Deg135 => [(1, -1), (-1, 1)],
        }
    }
}

/// Snaps a Sobel response pair to its quantized direction.
pub fn quantize_direction(cx: f64, cy: f64) -> GradientDirection {
    let mut theta = cy.atan2(cx).to_degrees().trunc() as i32;
    if theta < 0 {
        theta += HALF_TURN;
    }

    let mut lowest = 0;
    for (i, &reference) in REFERENCE_ANGLES.iter().enumerate() {
        let distance = (theta - reference).pow(2);
        let lowest_distance = (theta - REFERENCE_ANGLES[lowest]).pow(2);
        if lowest_distance > distance {
            lowest = i;
        }
    }

    match REFERENCE_ANGLES[lowest] {
        45 => GradientDirection::Deg45,
        90 => GradientDirection::Deg90,
        135 => GradientDirection::Deg135,
        _ => GradientDirection::Deg0,
    }
}

/// `|cx| / 2 + |cy| / 2`.
#[inline]
pub fn magnitude(cx: f64, cy: f64) -> f64 {
    cx.abs() / MAGNITUDE_AVERAGING + cy.abs() / MAGNITUDE_AVERAGING
}

/// Output of the gradient stage.
#[derive(Debug)]
pub struct Gradient {
    /// Edge strength per pixel. Shares storage with the consumed input buffer.
    pub magnitude: LumaBuffer,
    /// Quantized direction per pixel, stored as degrees.
    pub direction: LumaBuffer,
}

/// Computes magnitude and quantized direction of `blurred`.
pub fn gradient(blurred: LumaBuffer, border: BorderPolicy) -> Result<Gradient> {
    let cx = convolve(&Kernel::sobel_horizontal(), &blurred, border)?;
    let cy = convolve(&Kernel::sobel_vertical(), &blurred, border)?;
    let direction = LumaBuffer::new(blurred.width(), blurred.height())?;

    for i in 0..blurred.len() {
        let (x, y) = (cx.get_at(i).luminance(), cy.get_at(i).luminance());
        blurred.set_at(i, LumaPixel::splat(magnitude(x, y)));
        direction.set_at(i, LumaPixel::splat(quantize_direction(x, y).degrees() as f64));
    }

    Ok(Gradient {
        magnitude: blurred,
        direction,
    })
}

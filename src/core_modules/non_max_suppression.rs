// THEORY:
// Non-maximum suppression thins the magnitude image down to ridge lines. Each
// interior pixel is compared with the two neighbours that lie along its
// quantized gradient direction:
//
//     0   -> west / east
//     90  -> south / north
//     45  -> northwest / southeast
//     135 -> northeast / southwest
//
// and is zeroed unless it is strictly greater than both (ties lose). Pixels
// whose direction value is not one of the four reference angles are left alone,
// and so is the one-pixel border ring.
//
// The stage consumes the magnitude buffer and updates it in place, scanning rows
// top to bottom and columns left to right. A pixel's north and west neighbours
// have therefore already been decided when it is examined.

use crate::core_modules::error::Result;
use crate::core_modules::gradient::GradientDirection;
use crate::core_modules::pixel_buffer::LumaBuffer;

pub fn suppress(magnitude: LumaBuffer, direction: &LumaBuffer) -> Result<LumaBuffer> {
    magnitude.ensure_same_shape(direction)?;
    let (width, height) = (magnitude.width(), magnitude.height());

    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            let Some(quantized) = GradientDirection::from_degrees(direction.luma(x, y)) else {
                continue;
            };
            let current = magnitude.luma(x, y);
            let is_peak = quantized.neighbor_offsets().iter().all(|&(dx, dy)| {
                let nx = (x as isize + dx) as usize;
                let ny = (y as isize + dy) as usize;
                current > magnitude.luma(nx, ny)
            });
            if !is_peak {
                magnitude.set_luma(x, y, 0.0);
            }
        }
    }

    Ok(magnitude)
}

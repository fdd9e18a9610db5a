// THEORY:
// The last stage turns the thinned ridge image into the final edge map. For every
// interior pixel:
//
// 1.  At or below the strong-pixel threshold (42 by default): zero it.
// 2.  Above the threshold: look at its neighbourhood and zero it if every
//     inspected neighbour is already zero. A strong response with no support
//     around it is treated as noise.
//
// Like suppression, pruning updates the buffer it consumed in place, in raster
// order, so the north and west neighbours have already been pruned when a pixel
// is examined. The border ring is never touched.
//
// Two neighbourhoods are available. `Full` inspects all eight neighbours.
// `Legacy` inspects east, west, south, north, southwest, east (again), northwest
// and northeast: southeast is never looked at. Older edge maps were produced with
// `Legacy`; pick it when output has to match them bit for bit.

use crate::core_modules::pixel_buffer::LumaBuffer;

pub const STRONG_PIXEL_THRESHOLD: f64 = 42.0;

const FULL_NEIGHBORHOOD: [(isize, isize); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (-1, 1),
    (1, 1),
    (-1, -1),
    (1, -1),
];

const LEGACY_NEIGHBORHOOD: [(isize, isize); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (-1, 1),
    (1, 0),
    (-1, -1),
    (1, -1),
];

/// Which neighbours count as support for a strong pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PruneNeighborhood {
    /// All eight neighbours.
    #[default]
    Full,
    /// East twice, southeast never.
    Legacy,
}

impl PruneNeighborhood {
    pub fn offsets(self) -> &'static [(isize, isize); 8] {
        match self {
            PruneNeighborhood::Full => &FULL_NEIGHBORHOOD,
            PruneNeighborhood::Legacy => &LEGACY_NEIGHBORHOOD,
        }
    }
}

pub fn prune(suppressed: LumaBuffer, threshold: f64, neighborhood: PruneNeighborhood) -> LumaBuffer {
    let (width, height) = (suppressed.width(), suppressed.height());
    let offsets = neighborhood.offsets();

    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            if suppressed.luma(x, y) <= threshold {
                suppressed.set_luma(x, y, 0.0);
                continue;
            }

            let isolated = offsets.iter().all(|&(dx, dy)| {
                let nx = (x as isize + dx) as usize;
                let ny = (y as isize + dy) as usize;
                suppressed.luma(nx, ny) == 0.0
            });
            if isolated {
                suppressed.set_luma(x, y, 0.0);
            }
        }
    }

    suppressed
}

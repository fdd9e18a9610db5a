// THEORY:
// The engine never talks to display hardware. It only needs something that can
// be cleared, have single pixels set by (x, y) with a packed 16-bit color, and be
// presented. `RenderSurface` is that seam. The VGA character device of the
// original board is one implementation; `FrameBufferSurface` is an in-memory one
// that double-buffers like the device and can be exported to PNG for
// inspection.
//
// Colors are packed 5-6-5: blue in the low five bits, green in the middle six,
// red in the high five.

use crate::core_modules::picture::Picture;
use crate::core_modules::pixel::pixel::Pixel;

pub type Rgb565 = u16;

const RED_BLUE_DROP: u32 = 3;
const GREEN_DROP: u32 = 2;
const GREEN_SHIFT: u32 = 5;
const RED_SHIFT: u32 = 11;

/// Packs a byte pixel into a 5-6-5 color.
pub fn pack_rgb565(pixel: Pixel) -> Rgb565 {
    (pixel.blue as Rgb565 >> RED_BLUE_DROP)
        | (pixel.green as Rgb565 >> GREEN_DROP) << GREEN_SHIFT
        | (pixel.red as Rgb565 >> RED_BLUE_DROP) << RED_SHIFT
}

/// Expands a 5-6-5 color back to 8-bit `[red, green, blue]`, replicating the
/// high bits into the vacated low bits.
pub fn unpack_rgb565(color: Rgb565) -> [u8; 3] {
    let red = ((color >> RED_SHIFT) & 0x1f) as u8;
    let green = ((color >> GREEN_SHIFT) & 0x3f) as u8;
    let blue = (color & 0x1f) as u8;
    [
        (red << 3) | (red >> 2),
        (green << 2) | (green >> 4),
        (blue << 3) | (blue >> 2),
    ]
}

/// A display the engine can draw finished pictures on.
pub trait RenderSurface {
    /// Visible `(width, height)` in pixels.
    fn dimensions(&self) -> (usize, usize);
    fn clear(&mut self);
    fn set_pixel(&mut self, x: usize, y: usize, color: Rgb565);
    /// Presents everything drawn since the last call.
    fn show(&mut self);
}

/// Clears `surface`, draws `picture` centred horizontally when it is narrower
/// than the surface, clips whatever does not fit, then presents.
pub fn draw_picture<S: RenderSurface + ?Sized>(surface: &mut S, picture: &Picture) {
    let (screen_width, screen_height) = surface.dimensions();
    let (width, height) = (picture.width(), picture.height());
    let offset = if width < screen_width {
        (screen_width - width) / 2
    } else {
        0
    };

    surface.clear();
    for col in 0..width.min(screen_width) {
        for row in 0..height.min(screen_height) {
            let pixel = picture.pixels().get(col, row);
            surface.set_pixel(col + offset, row, pack_rgb565(pixel));
        }
    }
    surface.show();
}

/// In-memory double-buffered surface.
#[derive(Debug, Clone)]
pub struct FrameBufferSurface {
    width: usize,
    height: usize,
    back: Vec<Rgb565>,
    front: Vec<Rgb565>,
    frames_shown: u64,
}

impl FrameBufferSurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            back: vec![0; width * height],
            front: vec![0; width * height],
            frames_shown: 0,
        }
    }

    /// The most recently presented frame, row-major.
    pub fn front(&self) -> &[Rgb565] {
        &self.front
    }

    /// Color at `(x, y)` of the presented frame.
    pub fn shown_pixel(&self, x: usize, y: usize) -> Option<Rgb565> {
        (x < self.width && y < self.height).then(|| self.front[y * self.width + x])
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }
}

impl RenderSurface for FrameBufferSurface {
    fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.back.fill(0);
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: Rgb565) {
        if x < self.width && y < self.height {
            self.back[y * self.width + x] = color;
        }
    }

    fn show(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
        self.frames_shown += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::picture::synthetic_header;
    use crate::core_modules::pixel_buffer::ByteBuffer;
    use std::rc::Rc;

    fn picture(width: usize, height: usize, pixel: Pixel) -> Picture {
        let pixels = ByteBuffer::from_fn(width, height, |_, _| pixel).unwrap();
        let header = synthetic_header(width as i32, height as i32);
        Picture::new(pixels, Rc::new(header), "test.bmp")
    }

    #[test]
    fn packs_five_six_five() {
        assert_eq!(pack_rgb565(Pixel::new(255, 255, 255)), 0xffff);
        assert_eq!(pack_rgb565(Pixel::new(255, 0, 0)), 0xf800);
        assert_eq!(pack_rgb565(Pixel::new(0, 255, 0)), 0x07e0);
        assert_eq!(pack_rgb565(Pixel::new(0, 0, 255)), 0x001f);
        assert_eq!(pack_rgb565(Pixel::gray(0)), 0);
    }

    #[test]
    fn unpack_restores_extremes() {
        assert_eq!(unpack_rgb565(0xffff), [255, 255, 255]);
        assert_eq!(unpack_rgb565(0xf800), [255, 0, 0]);
        assert_eq!(unpack_rgb565(0), [0, 0, 0]);
    }

    #[test]
    fn narrow_picture_is_centred_and_presented() {
        let mut surface = FrameBufferSurface::new(10, 4);
        draw_picture(&mut surface, &picture(4, 2, Pixel::gray(255)));

        assert_eq!(surface.frames_shown(), 1);
        assert_eq!(surface.shown_pixel(2, 0), Some(0));
        assert_eq!(surface.shown_pixel(3, 0), Some(0xffff));
        assert_eq!(surface.shown_pixel(6, 1), Some(0xffff));
        assert_eq!(surface.shown_pixel(7, 1), Some(0));
        assert_eq!(surface.shown_pixel(3, 2), Some(0));
    }

    #[test]
    fn oversized_picture_is_clipped() {
        let mut surface = FrameBufferSurface::new(3, 2);
        draw_picture(&mut surface, &picture(8, 5, Pixel::new(255, 0, 0)));
        assert!(surface.front().iter().all(|&c| c == 0xf800));
    }

    #[test]
    fn redraw_clears_the_previous_frame() {
        let mut surface = FrameBufferSurface::new(6, 2);
        draw_picture(&mut surface, &picture(6, 2, Pixel::gray(255)));
        draw_picture(&mut surface, &picture(2, 2, Pixel::gray(255)));
        assert_eq!(surface.frames_shown(), 2);
        assert_eq!(surface.shown_pixel(0, 0), Some(0));
        assert_eq!(surface.shown_pixel(2, 0), Some(0xffff));
    }
}

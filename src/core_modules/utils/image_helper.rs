pub mod image_helper {
    use crate::core_modules::error::{Result, VisionError};
    use crate::core_modules::picture::Picture;
    use crate::core_modules::render::{FrameBufferSurface, RenderSurface, unpack_rgb565};
    use image::ImageEncoder;
    use std::path::Path;

    /// Writes a tightly packed RGB8 buffer as a PNG.
    pub fn save(path: &Path, width: u32, height: u32, buffer: &[u8]) -> Result<()> {
        let encode_error = |message: String| VisionError::Encode {
            path: path.to_path_buf(),
            message,
        };
        let output = std::fs::File::create(path).map_err(|e| encode_error(e.to_string()))?;
        let encoder = image::codecs::png::PngEncoder::new(output);

        encoder
            .write_image(buffer, width, height, image::ExtendedColorType::Rgb8)
            .map_err(|e| encode_error(e.to_string()))
    }

    /// Exports the presented frame of a surface, expanding 5-6-5 colors to 8 bits.
    pub fn save_surface(path: &Path, surface: &FrameBufferSurface) -> Result<()> {
        let (width, height) = surface.dimensions();
        let buffer: Vec<u8> = surface.front().iter().flat_map(|&c| unpack_rgb565(c)).collect();
        save(path, width as u32, height as u32, &buffer)
    }

    /// Exports a picture at full 8-bit depth, rows in stored order.
    pub fn save_picture(path: &Path, picture: &Picture) -> Result<()> {
        let buffer: Vec<u8> = picture
            .pixels()
            .iter()
            .flat_map(|p| [p.red, p.green, p.blue])
            .collect();
        save(path, picture.width() as u32, picture.height() as u32, &buffer)
    }
}

#[cfg(test)]
mod tests {

    use super::image_helper::*;
    use crate::core_modules::picture::Picture;
    use crate::core_modules::pixel::pixel::Pixel;
    use crate::core_modules::pixel_buffer::ByteBuffer;
    use crate::core_modules::render::{FrameBufferSurface, draw_picture};
    use std::rc::Rc;

    fn gradient_picture(width: usize, height: usize) -> Picture {
        let pixels = ByteBuffer::from_fn(width, height, |x, _| Pixel::gray((x % 256) as u8)).unwrap();
        let header = crate::core_modules::picture::synthetic_header(width as i32, height as i32);
        Picture::new(pixels, Rc::new(header), "gradient.bmp")
    }

    #[test]
    fn save_picture_round_trips_through_png() {
        let path = std::env::temp_dir().join(format!("edge_vision_{}_gradient.png", std::process::id()));
        save_picture(&path, &gradient_picture(40, 12)).expect("Error Saving File.");

        let decoded = image::open(&path).unwrap().into_rgb8();
        assert_eq!(decoded.dimensions(), (40, 12));
        assert_eq!(decoded.get_pixel(17, 5).0, [17, 17, 17]);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn save_surface_exports_the_presented_frame() {
        let path = std::env::temp_dir().join(format!("edge_vision_{}_surface.png", std::process::id()));
        let mut surface = FrameBufferSurface::new(64, 16);
        draw_picture(&mut surface, &gradient_picture(32, 16));
        save_surface(&path, &surface).expect("Error Saving File.");

        let decoded = image::open(&path).unwrap().into_rgb8();
        assert_eq!(decoded.dimensions(), (64, 16));
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0]);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn unwritable_path_is_an_encode_error() {
        let path = std::env::temp_dir().join("edge_vision_missing_dir").join("x").join("out.png");
        let err = save_picture(&path, &gradient_picture(4, 4)).unwrap_err();
        assert!(matches!(err, crate::core_modules::error::VisionError::Encode { .. }));
    }
}

// THEORY:
// A `Picture` is a decoded 24-bit bitmap: its pixels, the raw 54-byte file header
// it came with, and the name of the file. The header is opaque to the engine. We
// read two numbers out of it (width at offset 18, height at offset 22) and
// otherwise carry it along untouched so a processed picture can be written back
// with exactly the header it was read with.
//
// The codec is intentionally literal:
// - no check of the `BM` magic, bit depth or compression (a `warn!` is emitted
//   for the obvious cases, nothing is rejected);
// - no row padding, so rows whose byte length is not a multiple of 4 will be
//   read skewed, exactly like the firmware that produced these files expects;
// - rows are kept in file order, which for ordinary bitmaps is bottom-up.
//
// Picture handles are cheap to clone. A clone shares both the pixel storage and
// the header with the original.

use crate::core_modules::error::{Result, VisionError};
use crate::core_modules::pixel::pixel::{BYTES_PER_PIXEL, Byte, Pixel};
use crate::core_modules::pixel_buffer::{ByteBuffer, LumaBuffer};
use log::{debug, warn};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::rc::Rc;

pub const HEADER_SIZE: usize = 54;
const WIDTH_OFFSET: usize = 18;
const HEIGHT_OFFSET: usize = 22;
const MAGIC: &[u8; 2] = b"BM";

pub type Header = [Byte; HEADER_SIZE];

/// Mirror operation applied to a picture before it is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Flip {
    /// Reverse the row order (bottom-up file storage to top-down display).
    #[default]
    Vertical,
    /// Reverse each row.
    Horizontal,
    /// Both of the above.
    Both,
    /// Leave the picture as stored.
    Keep,
}

#[derive(Clone, Debug)]
pub struct Picture {
    pixels: ByteBuffer,
    header: Rc<Header>,
    file_name: String,
}

impl Picture {
    pub fn new(pixels: ByteBuffer, header: Rc<Header>, file_name: impl Into<String>) -> Self {
        Self {
            pixels,
            header,
            file_name: file_name.into(),
        }
    }

    /// Reads and decodes a bitmap file. See [`bitmap_codec::decode`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        bitmap_codec::decode(path)
    }

    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &ByteBuffer {
        &self.pixels
    }

    pub fn header(&self) -> &Rc<Header> {
        &self.header
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// A picture with new pixel storage but this picture's header handle and name.
    pub fn with_pixels(&self, pixels: ByteBuffer) -> Result<Self> {
        self.pixels.ensure_same_shape(&pixels)?;
        Ok(Self {
            pixels,
            header: Rc::clone(&self.header),
            file_name: self.file_name.clone(),
        })
    }

    /// A mirrored copy. The original is left untouched.
    pub fn flipped(&self, flip: Flip) -> Result<Self> {
        if flip == Flip::Keep {
            return self.with_pixels(self.pixels.deep_copy());
        }

        let (width, height) = (self.width(), self.height());
        let mirror_x = matches!(flip, Flip::Horizontal | Flip::Both);
        let mirror_y = matches!(flip, Flip::Vertical | Flip::Both);
        let source = &self.pixels;
        let pixels = ByteBuffer::from_fn(width, height, |x, y| {
            let sx = if mirror_x { width - 1 - x } else { x };
            let sy = if mirror_y { height - 1 - y } else { y };
            source.get(sx, sy)
        })?;
        self.with_pixels(pixels)
    }
}

/// Reads width and height out of a raw header.
pub fn header_dimensions(header: &Header) -> (i32, i32) {
    let read_i32 = |offset: usize| {
        i32::from_le_bytes([
            header[offset],
            header[offset + 1],
            header[offset + 2],
            header[offset + 3],
        ])
    };
    (read_i32(WIDTH_OFFSET), read_i32(HEIGHT_OFFSET))
}

/// Builds a minimal 24-bit header for the given size. Used when a picture is
/// synthesised rather than decoded.
pub fn synthetic_header(width: i32, height: i32) -> Header {
    let image_bytes = (width as i64)
        .saturating_mul(height as i64)
        .saturating_mul(BYTES_PER_PIXEL as i64)
        .clamp(0, (u32::MAX - HEADER_SIZE as u32) as i64) as u32;
    let mut header = [0u8; HEADER_SIZE];
    header[0..2].copy_from_slice(MAGIC);
    header[2..6].copy_from_slice(&(HEADER_SIZE as u32 + image_bytes).to_le_bytes());
    header[10..14].copy_from_slice(&(HEADER_SIZE as u32).to_le_bytes());
    header[14..18].copy_from_slice(&40u32.to_le_bytes());
    header[WIDTH_OFFSET..WIDTH_OFFSET + 4].copy_from_slice(&width.to_le_bytes());
    header[HEIGHT_OFFSET..HEIGHT_OFFSET + 4].copy_from_slice(&height.to_le_bytes());
    header[26..28].copy_from_slice(&1u16.to_le_bytes());
    header[28..30].copy_from_slice(&24u16.to_le_bytes());
    header[34..38].copy_from_slice(&image_bytes.to_le_bytes());
    header
}

pub mod bitmap_codec {
    use super::*;

    /// Opens `path` and decodes it as a 54-byte header followed by
    /// `width * height` (blue, green, red) records.
    pub fn decode(path: impl AsRef<Path>) -> Result<Picture> {
        let path = path.as_ref();
        let load_error = |source| VisionError::Load {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(load_error)?;
        let picture = decode_from(BufReader::new(file), path.display().to_string());
        match picture {
            Err(VisionError::Load { source, .. }) => Err(load_error(source)),
            other => other,
        }
    }

    /// Decodes a bitmap from any byte source. `file_name` is recorded on the picture.
    pub fn decode_from<R: Read>(mut reader: R, file_name: String) -> Result<Picture> {
        let load_error = |source| VisionError::Load {
            path: file_name.clone().into(),
            source,
        };

        let mut header: Header = [0; HEADER_SIZE];
        reader.read_exact(&mut header).map_err(load_error)?;

        if &header[0..2] != MAGIC {
            warn!("{file_name}: header does not start with 'BM', decoding anyway");
        }

        let (width, height) = header_dimensions(&header);
        if width <= 0 || height <= 0 {
            return Err(VisionError::dimension(
                width as i64,
                height as i64,
                "bitmap header declares a non-positive size",
            ));
        }
        let (width, height) = (width as usize, height as usize);
        // 3 * width is a multiple of 4 exactly when width is.
        if width % 4 != 0 {
            warn!(
                "{file_name}: row of {} bytes is not 4-byte aligned; row padding is not handled",
                width.saturating_mul(BYTES_PER_PIXEL)
            );
        }

        let byte_len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| {
                VisionError::dimension(width as i64, height as i64, "bitmap size overflows")
            })?;
        // The header is not trusted for the allocation size: read what is there,
        // then compare.
        let mut raw = Vec::new();
        reader
            .by_ref()
            .take(byte_len as u64)
            .read_to_end(&mut raw)
            .map_err(load_error)?;
        if raw.len() < byte_len {
            return Err(load_error(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("expected {byte_len} bytes of pixel data, found {}", raw.len()),
            )));
        }

        let records = raw
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|bgr| Pixel::from([bgr[0], bgr[1], bgr[2]]))
            .collect();
        let pixels = ByteBuffer::from_vec(width, height, records)?;
        debug!("decoded {file_name}: {width}x{height}");

        Ok(Picture::new(pixels, Rc::new(header), file_name))
    }

    /// Writes `header` verbatim followed by the luminance buffer, with the red
    /// (luminance) channel copied into green and blue.
    pub fn encode_grayscale(path: impl AsRef<Path>, header: &Header, buffer: &LumaBuffer) -> Result<()> {
        write_file(path.as_ref(), |writer| {
            write_grayscale(writer, header, buffer)
        })
    }

    pub fn write_grayscale<W: Write>(mut writer: W, header: &Header, buffer: &LumaBuffer) -> std::io::Result<()> {
        writer.write_all(header)?;
        for luma in buffer.iter() {
            let bytes: [Byte; BYTES_PER_PIXEL] = Pixel::from_luma(luma).into();
            writer.write_all(&bytes)?;
        }
        writer.flush()
    }

    /// Writes a full three-channel picture with its own header.
    pub fn encode_picture(path: impl AsRef<Path>, picture: &Picture) -> Result<()> {
        write_file(path.as_ref(), |writer| write_picture(writer, picture))
    }

    pub fn write_picture<W: Write>(mut writer: W, picture: &Picture) -> std::io::Result<()> {
        writer.write_all(picture.header().as_ref())?;
        for pixel in picture.pixels().iter() {
            let bytes: [Byte; BYTES_PER_PIXEL] = pixel.into();
            writer.write_all(&bytes)?;
        }
        writer.flush()
    }

    fn write_file(
        path: &Path,
        body: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
    ) -> Result<()> {
        let encode_error = |e: std::io::Error| VisionError::Encode {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        let file = File::create(path).map_err(encode_error)?;
        let mut writer = BufWriter::new(file);
        body(&mut writer).map_err(encode_error)
    }
}

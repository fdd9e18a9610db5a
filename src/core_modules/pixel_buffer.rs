// THEORY:
// `PixelBuffer<T>` is the container every stage hands to the next one. It is a
// width, a height and a *handle* to a flat, row-major array of pixel records.
//
// Key properties:
// 1.  **Shared, not copied**: `share()` (and `Clone`) hands out another handle to
//     the same storage. Writing through one handle is visible through every
//     other handle. Storage is released when the last handle is dropped.
// 2.  **Single-threaded by construction**: the share count is an `Rc`, so a
//     buffer is neither `Send` nor `Sync`. The compiler refuses to move any
//     handle of a buffer family to another thread; parallelism is only possible
//     between independent invocations that each build their own buffers.
// 3.  **Validated once**: the shape is checked when the buffer is created
//     (`width > 0`, `height > 0`, no overflow) and is immutable afterwards. A new
//     shape always means a new buffer.
// 4.  **Cell storage**: records are `Copy` and live in `Cell`s, which is what lets
//     a stage mutate a buffer through a shared handle without runtime borrow
//     tracking.

use crate::core_modules::error::{Result, VisionError};
use crate::core_modules::pixel::pixel::{LumaPixel, Pixel};
use std::cell::Cell;
use std::rc::Rc;

/// Buffer of intermediate luminance records.
pub type LumaBuffer = PixelBuffer<LumaPixel>;
/// Buffer of on-disk byte pixels.
pub type ByteBuffer = PixelBuffer<Pixel>;

pub struct PixelBuffer<T: Copy> {
    width: usize,
    height: usize,
    data: Rc<[Cell<T>]>,
}

impl<T: Copy + Default> PixelBuffer<T> {
    /// Allocates a buffer of `T::default()` records with a share count of 1.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let len = checked_len(width, height)?;
        let data = (0..len).map(|_| Cell::new(T::default())).collect();
        Ok(Self { width, height, data })
    }
}

impl<T: Copy> PixelBuffer<T> {
    /// Wraps existing row-major records. `records.len()` must be `width * height`.
    pub fn from_vec(width: usize, height: usize, records: Vec<T>) -> Result<Self> {
        let len = checked_len(width, height)?;
        if records.len() != len {
            return Err(VisionError::dimension(
                width as i64,
                height as i64,
                "record count does not match width * height",
            ));
        }
        let data = records.into_iter().map(Cell::new).collect();
        Ok(Self { width, height, data })
    }

    /// Builds a buffer by evaluating `f(x, y)` for every position in raster order.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Result<Self> {
        let len = checked_len(width, height)?;
        let data = (0..len).map(|i| Cell::new(f(i % width, i / width))).collect();
        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of live handles aliasing this storage.
    pub fn share_count(&self) -> usize {
        Rc::strong_count(&self.data)
    }

    /// Returns another handle to the same storage. No records are copied.
    pub fn share(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: Rc::clone(&self.data),
        }
    }

    /// True when both handles alias the same storage.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// An independent buffer with the same shape and contents.
    pub fn deep_copy(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|cell| Cell::new(cell.get())).collect(),
        }
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[self.index(x, y)].get()
    }

    #[inline]
    pub fn set(&self, x: usize, y: usize, value: T) {
        self.data[self.index(x, y)].set(value);
    }

    #[inline]
    pub fn get_at(&self, index: usize) -> T {
        self.data[index].get()
    }

    #[inline]
    pub fn set_at(&self, index: usize, value: T) {
        self.data[index].set(value);
    }

    /// Signed lookup; `None` outside `[0, width) x [0, height)`.
    #[inline]
    pub fn checked_get(&self, x: isize, y: isize) -> Option<T> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(self.get(x as usize, y as usize))
    }

    /// Copies the records out in raster order.
    pub fn to_vec(&self) -> Vec<T> {
        self.data.iter().map(Cell::get).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.data.iter().map(Cell::get)
    }

    /// Fails with a dimension error unless `other` has the same width and height.
    pub fn ensure_same_shape<U: Copy>(&self, other: &PixelBuffer<U>) -> Result<()> {
        if self.width != other.width || self.height != other.height {
            return Err(VisionError::dimension(
                other.width as i64,
                other.height as i64,
                "buffer shape differs from its stage partner",
            ));
        }
        Ok(())
    }

    /// A new buffer of the same shape holding `f(record)` for each record.
    pub fn map<U: Copy>(&self, mut f: impl FnMut(T) -> U) -> PixelBuffer<U> {
        PixelBuffer {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|cell| Cell::new(f(cell.get()))).collect(),
        }
    }
}

impl<T: Copy> Clone for PixelBuffer<T> {
    /// Cloning a handle aliases the storage; see [`PixelBuffer::deep_copy`] for a copy.
    fn clone(&self) -> Self {
        self.share()
    }
}

impl<T: Copy + std::fmt::Debug> std::fmt::Debug for PixelBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("share_count", &self.share_count())
            .finish()
    }
}

impl LumaBuffer {
    /// The canonical luminance channel at `(x, y)`.
    #[inline]
    pub fn luma(&self, x: usize, y: usize) -> f64 {
        self.get(x, y).luminance()
    }

    /// Writes `value` into all three channels at `(x, y)`.
    #[inline]
    pub fn set_luma(&self, x: usize, y: usize, value: f64) {
        self.set(x, y, LumaPixel::splat(value));
    }
}

fn checked_len(width: usize, height: usize) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(VisionError::dimension(
            width as i64,
            height as i64,
            "width and height must be positive",
        ));
    }
    width.checked_mul(height).ok_or_else(|| {
        VisionError::dimension(width as i64, height as i64, "width * height overflows")
    })
}

// THEORY (Pixel records):
// Two record types flow through the engine.
//
// - `Pixel` is the on-disk unit: three bytes in bitmap order (blue, green, red).
//   It is what the codec reads and writes and what a display surface ultimately
//   receives.
// - `LumaPixel` is the working unit of every intermediate stage. It keeps three
//   f64 channels so that convolution sums, signed Sobel responses and magnitudes
//   larger than 255 survive untouched until the final write-back. Stages only
//   ever store luminance, replicated into all three channels, so any stage may
//   read whichever channel it likes.
//
// The byte conversion at the end saturates: negative values become 0 and values
// above 255 become 255.

pub mod pixel {
    pub type Byte = u8;
    pub type Channel = Byte;
    pub type LumaChannel = f64;
    pub type Luminance = f64;

    /// Number of bytes a `Pixel` occupies on disk.
    pub const BYTES_PER_PIXEL: usize = 3;

    /// A "dumb" data container for a single 24-bit bitmap pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The blue channel value (0-255). First byte on disk.
        pub blue: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The red channel value (0-255). Last byte on disk.
        pub red: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Pixel { blue, green, red }
        }

        pub fn gray(value: Channel) -> Self {
            Pixel::new(value, value, value)
        }

        /// Unweighted channel mean, `(b + g + r) / 3`.
        ///
        /// This is deliberately not a perceptual luma; every channel counts the same.
        pub fn average(&self) -> Luminance {
            (self.blue as Luminance + self.green as Luminance + self.red as Luminance) / 3.0
        }

        /// Builds a byte pixel from the red channel of a luminance record,
        /// replicated across all three channels.
        pub fn from_luma(luma: LumaPixel) -> Self {
            Pixel::gray(saturate(luma.red))
        }
    }

    impl From<[Byte; BYTES_PER_PIXEL]> for Pixel {
        fn from(bgr: [Byte; BYTES_PER_PIXEL]) -> Self {
            Pixel {
                blue: bgr[0],
                green: bgr[1],
                red: bgr[2],
            }
        }
    }

    impl From<Pixel> for [Byte; BYTES_PER_PIXEL] {
        fn from(pixel: Pixel) -> Self {
            [pixel.blue, pixel.green, pixel.red]
        }
    }

    /// Intermediate pixel with double-precision channels.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct LumaPixel {
        pub blue: LumaChannel,
        pub green: LumaChannel,
        pub red: LumaChannel,
    }

    impl LumaPixel {
        /// A record holding `value` in all three channels.
        pub fn splat(value: LumaChannel) -> Self {
            LumaPixel {
                blue: value,
                green: value,
                red: value,
            }
        }

        /// The canonical channel read by every stage.
        #[inline]
        pub fn luminance(&self) -> Luminance {
            self.red
        }
    }

    #[inline]
    fn saturate(value: LumaChannel) -> Channel {
        // `as` saturates float-to-int casts and maps NaN to zero.
        value as Channel
    }
}

#[cfg(test)]
mod tests {
    use super::pixel::*;

    #[test]
    fn disk_order_is_blue_green_red() {
        let pixel = Pixel::from([10, 20, 30]);
        assert_eq!(pixel.blue, 10);
        assert_eq!(pixel.green, 20);
        assert_eq!(pixel.red, 30);
        let bytes: [Byte; BYTES_PER_PIXEL] = pixel.into();
        assert_eq!(bytes, [10, 20, 30]);
    }

    #[test]
    fn average_is_unweighted() {
        let pixel = Pixel::new(255, 0, 0);
        assert_eq!(pixel.average(), 85.0);
        assert_eq!(Pixel::new(1, 2, 3).average(), 2.0);
    }

    #[test]
    fn write_back_saturates() {
        assert_eq!(Pixel::from_luma(LumaPixel::splat(-12.0)), Pixel::gray(0));
        assert_eq!(Pixel::from_luma(LumaPixel::splat(1020.0)), Pixel::gray(255));
        assert_eq!(Pixel::from_luma(LumaPixel::splat(42.9)), Pixel::gray(42));
    }
}

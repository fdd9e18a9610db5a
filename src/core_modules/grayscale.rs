// THEORY:
// The grayscale reducer is the first stage. It collapses three channels into one
// luminance value, `(b + g + r) / 3`, and writes that value into all three
// channels of a fresh luminance buffer. Because the output channels are equal,
// running the reducer again on its own output changes nothing.

use crate::core_modules::pixel::pixel::{Luminance, LumaPixel, Pixel};
use crate::core_modules::pixel_buffer::{LumaBuffer, PixelBuffer};
use crate::core_modules::picture::Picture;

/// A record that can report the unweighted mean of its three channels.
pub trait ChannelMean: Copy {
    fn channel_mean(&self) -> Luminance;
}

impl ChannelMean for Pixel {
    fn channel_mean(&self) -> Luminance {
        self.average()
    }
}

impl ChannelMean for LumaPixel {
    fn channel_mean(&self) -> Luminance {
        // Equal channels are returned as-is; (v + v + v) / 3 does not always round back to v.
        if self.blue == self.green && self.green == self.red {
            return self.red;
        }
        (self.blue + self.green + self.red) / 3.0
    }
}

/// Reduces any three-channel buffer to a luminance buffer of the same shape.
pub fn grayscale<T: ChannelMean>(buffer: &PixelBuffer<T>) -> LumaBuffer {
    buffer.map(|pixel| LumaPixel::splat(pixel.channel_mean()))
}

/// Reduces a decoded picture to luminance.
pub fn to_grayscale(picture: &Picture) -> LumaBuffer {
    grayscale(picture.pixels())
}

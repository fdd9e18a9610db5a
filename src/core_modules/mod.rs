pub mod convolution;
pub mod error;
pub mod gradient;
pub mod grayscale;
pub mod isolation_pruner;
pub mod non_max_suppression;
pub mod picture;
pub mod pixel;
pub mod pixel_buffer;
pub mod render;
pub mod utils;

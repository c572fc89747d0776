//! Raster image derivatives

pub mod normalizer;
pub mod resize;

pub use normalizer::{is_supported_raster, ImageNormalizer};
pub use resize::ImageResize;

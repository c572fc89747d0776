//! Paginated document rendering

pub mod rasterizer;

pub use rasterizer::{DocumentRasterizer, RasterizeError};

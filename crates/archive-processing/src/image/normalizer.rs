//! Square thumbnails and bounded previews, always encoded as JPEG.

use std::io::Cursor;

use archive_core::constants::IMAGE_EXTENSIONS;
use archive_core::content_type;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageResult, RgbImage};

use super::resize::ImageResize;

/// Whether `filename` has one of the raster extensions the normalizer accepts.
pub fn is_supported_raster(filename: &str) -> bool {
    content_type::extension(filename)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Produces JPEG derivatives from decoded images.
#[derive(Debug, Clone, Copy)]
pub struct ImageNormalizer {
    jpeg_quality: u8,
}

impl ImageNormalizer {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    /// Decode any format the `image` crate recognizes from its magic bytes.
    pub fn decode(data: &[u8]) -> ImageResult<DynamicImage> {
        let cursor = Cursor::new(data);
        image::ImageReader::new(cursor)
            .with_guessed_format()?
            .decode()
    }

    /// Center crop along the longer axis to a square of the shorter side.
    ///
    /// The crop starts at `floor(|w - h| / 2)`; when the difference is odd the
    /// extra pixel falls off the far edge.
    pub fn center_crop_square(img: &DynamicImage) -> DynamicImage {
        let (width, height) = img.dimensions();
        if width == height {
            return img.clone();
        }

        let side = width.min(height);
        let offset = width.abs_diff(height) / 2;
        if width > height {
            img.crop_imm(offset, 0, side, side)
        } else {
            img.crop_imm(0, offset, side, side)
        }
    }

    /// Drop any alpha channel by compositing onto opaque white.
    pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
        if !img.color().has_alpha() {
            return img.to_rgb8();
        }

        let rgba = img.to_rgba8();
        let mut rgb = RgbImage::new(rgba.width(), rgba.height());
        for (dst, src) in rgb.pixels_mut().zip(rgba.pixels()) {
            let alpha = src[3] as u32;
            for channel in 0..3 {
                let value = (src[channel] as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
                dst[channel] = value as u8;
            }
        }
        rgb
    }

    pub fn encode_jpeg(&self, img: &DynamicImage) -> ImageResult<Vec<u8>> {
        let rgb = Self::flatten_onto_white(img);
        let mut buffer = Vec::with_capacity((rgb.width() * rgb.height()) as usize / 4);
        let encoder = JpegEncoder::new_with_quality(&mut buffer, self.jpeg_quality);
        rgb.write_with_encoder(encoder)?;
        Ok(buffer)
    }

    /// Square-cropped JPEG no larger than `max_size` on either side.
    pub fn make_square_thumbnail(&self, img: &DynamicImage, max_size: u32) -> ImageResult<Vec<u8>> {
        let square = Self::center_crop_square(img);
        let bounded = ImageResize::bound_to(&square, max_size);
        self.encode_jpeg(&bounded)
    }

    /// Uncropped JPEG no larger than `max_size` on either side.
    pub fn make_preview(&self, img: &DynamicImage, max_size: u32) -> ImageResult<Vec<u8>> {
        let bounded = ImageResize::bound_to(img, max_size);
        self.encode_jpeg(&bounded)
    }
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new(75)
    }
}

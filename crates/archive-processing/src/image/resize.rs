use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> FilterType {
        let width_ratio = orig_width as f32 / new_width.max(1) as f32;
        let height_ratio = orig_height as f32 / new_height.max(1) as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            FilterType::Triangle
        } else if max_ratio > 1.5 {
            FilterType::CatmullRom
        } else {
            FilterType::Lanczos3
        }
    }

    /// Dimensions that fit inside `max_size` x `max_size`, preserving aspect ratio.
    /// Never larger than the original.
    pub fn bounded_dimensions(width: u32, height: u32, max_size: u32) -> (u32, u32) {
        let longest = width.max(height);
        if longest <= max_size {
            return (width, height);
        }

        let scale = max_size as f64 / longest as f64;
        let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max_size);
        (scaled(width), scaled(height))
    }

    /// Scale down so neither side exceeds `max_size`. Smaller images are returned
    /// unchanged.
    pub fn bound_to(img: &DynamicImage, max_size: u32) -> DynamicImage {
        let (width, height) = img.dimensions();
        let (new_width, new_height) = Self::bounded_dimensions(width, height, max_size);
        if (new_width, new_height) == (width, height) {
            return img.clone();
        }

        let filter = Self::select_filter(width, height, new_width, new_height);
        img.resize_exact(new_width, new_height, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_follows_downscale_ratio() {
        assert_eq!(ImageResize::select_filter(1000, 1000, 400, 400), FilterType::Triangle);
        assert_eq!(ImageResize::select_filter(700, 700, 400, 400), FilterType::CatmullRom);
        assert_eq!(ImageResize::select_filter(500, 500, 400, 400), FilterType::Lanczos3);
    }

    #[test]
    fn bounded_dimensions_preserve_aspect() {
        assert_eq!(ImageResize::bounded_dimensions(4000, 2000, 2000), (2000, 1000));
        assert_eq!(ImageResize::bounded_dimensions(1000, 3000, 400), (133, 400));
        assert_eq!(ImageResize::bounded_dimensions(300, 200, 400), (300, 200));
        assert_eq!(ImageResize::bounded_dimensions(5000, 1, 400), (400, 1));
    }

    #[test]
    fn bound_to_never_upscales() {
        let img = DynamicImage::new_rgb8(120, 80);
        let bounded = ImageResize::bound_to(&img, 400);
        assert_eq!(bounded.dimensions(), (120, 80));
    }
}

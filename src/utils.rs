use image::{ColorType, DynamicImage, GenericImageView, Pixel};

/// Read the RGB value of a single pixel.
///
/// Returns `None` when the image is not in an RGB colour space (grayscale
/// tiles included) or the coordinate is outside the image.
pub fn pixel_rgb(img: &DynamicImage, x: u32, y: u32) -> Option<[u8; 3]> {
    let is_rgb = matches!(
        img.color(),
        ColorType::Rgb8
            | ColorType::Rgba8
            | ColorType::Rgb16
            | ColorType::Rgba16
            | ColorType::Rgb32F
            | ColorType::Rgba32F
    );
    if !is_rgb || !img.in_bounds(x, y) {
        return None;
    }

    Some(img.get_pixel(x, y).to_rgb().0)
}

/// Find the lowest pixel row whose leftmost pixel is not pure black.
///
/// Scans the first pixel column from the bottom up. Unreadable pixels count
/// as black.
pub fn first_non_black_row(img: &DynamicImage) -> Option<u32> {
    (0..img.height())
        .rev()
        .find(|&y| matches!(pixel_rgb(img, 0, y), Some(rgb) if rgb != [0, 0, 0]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn test_pixel_rgb() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])));
        assert_eq!(pixel_rgb(&img, 3, 3), Some([1, 2, 3]));
        assert_eq!(pixel_rgb(&img, 4, 0), None);
    }

    #[test]
    fn test_grayscale_is_unreadable() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([200])));
        assert_eq!(pixel_rgb(&img, 0, 0), None);
        assert_eq!(first_non_black_row(&img), None);
    }

    #[test]
    fn test_with_black_bottom() {
        let mut img = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        for y in 90..100 {
            for x in 0..100 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }

        assert_eq!(first_non_black_row(&DynamicImage::ImageRgb8(img)), Some(89));
    }

    #[test]
    fn test_single_channel_counts() {
        let mut img = RgbImage::new(10, 10);
        img.put_pixel(0, 4, Rgb([0, 0, 1]));
        assert_eq!(first_non_black_row(&DynamicImage::ImageRgb8(img)), Some(4));
    }

    #[test]
    fn test_all_black() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(10, 10));
        assert_eq!(first_non_black_row(&img), None);
    }
}

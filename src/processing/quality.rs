use image::GrayImage;
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::filter::laplacian_filter;
use imageproc::gradients::sobel_gradients;
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::HashMap;

/// Blur score: variance of the Laplacian of the grayscale frame. Higher
/// means sharper. A degenerate flat frame scores exactly 0.
pub fn blur_score(gray: &GrayImage) -> f64 {
    let laplacian = laplacian_filter(gray);
    let n = (laplacian.width() * laplacian.height()) as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mut sum = 0.0;
    for pixel in laplacian.pixels() {
        sum += pixel.0[0] as f64;
    }
    let mean = sum / n;
    let mut var = 0.0;
    for pixel in laplacian.pixels() {
        let d = pixel.0[0] as f64 - mean;
        var += d * d;
    }
    var / n
}

/// Global intensity mean.
pub fn brightness_mean(gray: &GrayImage) -> f64 {
    let n = (gray.width() * gray.height()) as f64;
    if n == 0.0 {
        return 0.0;
    }
    gray.pixels().map(|p| p.0[0] as f64).sum::<f64>() / n
}

/// Global intensity standard deviation, used as the contrast measure.
pub fn contrast(gray: &GrayImage) -> f64 {
    let n = (gray.width() * gray.height()) as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean = brightness_mean(gray);
    let var = gray
        .pixels()
        .map(|p| {
            let d = p.0[0] as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    var.sqrt()
}

/// Sharpness: mean Sobel gradient magnitude over the frame.
pub fn sharpness(gray: &GrayImage) -> f64 {
    if gray.width() < 3 || gray.height() < 3 {
        return 0.0;
    }
    let gradients = sobel_gradients(gray);
    let n = (gradients.width() * gradients.height()) as f64;
    gradients.pixels().map(|p| p.0[0] as f64).sum::<f64>() / n
}

/// Noise estimate: standard deviation of the Laplacian response.
pub fn noise_level(gray: &GrayImage) -> f64 {
    blur_score(gray).sqrt()
}

/// Percentage of pixels darker than the shadow cutoff. A large dark share
/// indicates shadows across the subject or background.
pub fn shadow_percentage(gray: &GrayImage, intensity_cutoff: u8) -> f64 {
    let n = (gray.width() * gray.height()) as f64;
    if n == 0.0 {
        return 0.0;
    }
    let dark = gray.pixels().filter(|p| p.0[0] < intensity_cutoff).count() as f64;
    dark / n * 100.0
}

/// Count of bright connected regions large enough to be flash reflections.
/// Small specular highlights below `min_area` pixels are ignored.
pub fn glare_spot_count(gray: &GrayImage, intensity_cutoff: u8, min_area: u32) -> u32 {
    if gray.width() == 0 || gray.height() == 0 {
        return 0;
    }
    let bright = threshold(gray, intensity_cutoff, ThresholdType::Binary);
    let labels = connected_components(&bright, Connectivity::Eight, image::Luma([0u8]));

    let mut areas: HashMap<u32, u32> = HashMap::new();
    for pixel in labels.pixels() {
        let label = pixel.0[0];
        if label != 0 {
            *areas.entry(label).or_insert(0) += 1;
        }
    }
    areas.values().filter(|&&area| area >= min_area).count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn flat_frame(value: u8) -> GrayImage {
        GrayImage::from_pixel(64, 64, Luma([value]))
    }

    #[test]
    fn blank_frame_has_zero_blur_score() {
        assert_eq!(blur_score(&flat_frame(255)), 0.0);
        assert_eq!(blur_score(&flat_frame(0)), 0.0);
    }

    #[test]
    fn checkerboard_is_sharper_than_flat() {
        let mut board = GrayImage::new(64, 64);
        for (x, y, p) in board.enumerate_pixels_mut() {
            p.0[0] = if (x + y) % 2 == 0 { 0 } else { 255 };
        }
        assert!(blur_score(&board) > blur_score(&flat_frame(128)));
    }

    #[test]
    fn hard_edge_registers_as_sharp() {
        // Half black, half white: one strong vertical edge.
        let mut img = GrayImage::new(64, 64);
        for (x, _y, p) in img.enumerate_pixels_mut() {
            p.0[0] = if x < 32 { 0 } else { 255 };
        }
        assert!(sharpness(&img) > sharpness(&flat_frame(128)));
    }

    #[test]
    fn brightness_and_contrast_on_flat_frame() {
        let frame = flat_frame(200);
        assert!((brightness_mean(&frame) - 200.0).abs() < 1e-9);
        assert_eq!(contrast(&frame), 0.0);
    }

    #[test]
    fn shadow_percentage_counts_dark_half() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([255u8]));
        for y in 0..5 {
            for x in 0..10 {
                img.put_pixel(x, y, Luma([10u8]));
            }
        }
        let pct = shadow_percentage(&img, 50);
        assert!((pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn glare_spots_respect_min_area() {
        let mut img = GrayImage::from_pixel(50, 50, Luma([100u8]));
        // One 12x12 bright blob (144 px) and one 3x3 blob (9 px).
        for y in 5..17 {
            for x in 5..17 {
                img.put_pixel(x, y, Luma([250u8]));
            }
        }
        for y in 30..33 {
            for x in 30..33 {
                img.put_pixel(x, y, Luma([250u8]));
            }
        }
        assert_eq!(glare_spot_count(&img, 220, 100), 1);
        assert_eq!(glare_spot_count(&img, 220, 5), 2);
    }
}

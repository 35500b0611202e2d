use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::edges::canny;
use imageproc::hough::{detect_lines, LineDetectionOptions};

/// Intensity statistics over the fixed-width ring around the frame border.
#[derive(Debug, Clone, Copy)]
pub struct BorderStats {
    /// Mean intensity over the whole ring.
    pub mean: f64,
    /// Average of the four strips' standard deviations. Near 0 means a
    /// uniform (flat-filled) margin, the signature of a converted scan.
    pub avg_std: f64,
    /// Ring width in pixels actually sampled.
    pub ring_width: u32,
}

fn strip_stats(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Sample the four border strips (top, bottom, left, right) of `ring_width`
/// pixels and compute per-strip mean/std. The subject sits in the frame
/// center, so the ring approximates the background or scan margin.
pub fn border_statistics(gray: &GrayImage, ring_fraction: f64, min_ring_px: u32) -> BorderStats {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return BorderStats {
            mean: 0.0,
            avg_std: 0.0,
            ring_width: 0,
        };
    }

    let short_side = width.min(height);
    let ring_width = ((short_side as f64 * ring_fraction) as u32)
        .max(min_ring_px)
        .min(short_side / 2)
        .max(1);

    let mut top = Vec::new();
    let mut bottom = Vec::new();
    let mut left = Vec::new();
    let mut right = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let v = gray.get_pixel(x, y).0[0] as f64;
            if y < ring_width {
                top.push(v);
            }
            if y >= height - ring_width {
                bottom.push(v);
            }
            if x < ring_width {
                left.push(v);
            }
            if x >= width - ring_width {
                right.push(v);
            }
        }
    }

    let strips = [
        strip_stats(&top),
        strip_stats(&bottom),
        strip_stats(&left),
        strip_stats(&right),
    ];
    let mean = strips.iter().map(|s| s.0).sum::<f64>() / strips.len() as f64;
    let avg_std = strips.iter().map(|s| s.1).sum::<f64>() / strips.len() as f64;

    BorderStats {
        mean,
        avg_std,
        ring_width,
    }
}

/// Bounding box of the largest edge contour, assumed to be the document.
#[derive(Debug, Clone, Copy)]
pub struct DocumentRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DocumentRegion {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Locate the document in the frame by Canny edge detection and taking the
/// largest contour bounding box. Returns `None` when no contour is found
/// (e.g. a completely flat frame).
pub fn detect_document_region(gray: &GrayImage) -> Option<DocumentRegion> {
    if gray.width() < 3 || gray.height() < 3 {
        return None;
    }
    let edges = canny(gray, 50.0, 150.0);
    let contours = find_contours::<i32>(&edges);

    let mut best: Option<DocumentRegion> = None;
    for contour in &contours {
        if contour.points.is_empty() {
            continue;
        }
        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;
        for p in &contour.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let region = DocumentRegion {
            x: min_x.max(0) as u32,
            y: min_y.max(0) as u32,
            width: (max_x - min_x + 1).max(0) as u32,
            height: (max_y - min_y + 1).max(0) as u32,
        };
        if best.map_or(true, |b| region.area() > b.area()) {
            best = Some(region);
        }
    }
    best
}

/// Document occupancy: largest-contour bounding box area as a percentage of
/// the frame area.
pub fn document_occupancy(gray: &GrayImage) -> Option<f64> {
    let region = detect_document_region(gray)?;
    let frame_area = gray.width() as u64 * gray.height() as u64;
    if frame_area == 0 {
        return None;
    }
    Some(region.area() as f64 / frame_area as f64 * 100.0)
}

/// Document tilt in degrees, from the median deviation of detected Hough
/// lines against the horizontal. 0.0 when no lines are found.
pub fn document_tilt_degrees(gray: &GrayImage) -> f64 {
    if gray.width() < 3 || gray.height() < 3 {
        return 0.0;
    }
    let edges = canny(gray, 50.0, 150.0);
    let options = LineDetectionOptions {
        vote_threshold: (gray.width().min(gray.height()) / 4).max(40),
        suppression_radius: 8,
    };
    let lines = detect_lines(&edges, options);

    // Deviation of each line from the horizontal axis; lines at 90 degrees
    // in Hough space are horizontal in the image.
    let mut deviations: Vec<f64> = lines
        .iter()
        .take(10)
        .map(|line| {
            let mut d = line.angle_in_degrees as f64 - 90.0;
            // Vertical document edges read as deviation from vertical.
            if d > 45.0 {
                d -= 90.0;
            } else if d < -45.0 {
                d += 90.0;
            }
            d
        })
        .collect();

    if deviations.is_empty() {
        return 0.0;
    }
    deviations.sort_by(|a, b| a.partial_cmp(b).unwrap());
    deviations[deviations.len() / 2].abs()
}

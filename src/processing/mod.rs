pub mod border;
pub mod face;
pub mod quality;

pub use face::{FaceLandmarks, Landmark, LandmarkProvider, NoLandmarkProvider};

use log::{debug, warn};

use crate::config::EngineConfig;
use crate::models::metrics::names;
use crate::models::{Frame, MetricSet};
use crate::utils::EngineError;

/// Run every metric extractor over one frame and collect the results.
///
/// Extraction never short-circuits: a metric that cannot be produced is
/// recorded as absent so the evaluator can report it, and every other metric
/// is still computed.
pub fn compute_metrics(
    frame: &Frame,
    landmarks: &dyn LandmarkProvider,
    config: &EngineConfig,
) -> Result<MetricSet, EngineError> {
    let gray = frame.gray();
    let mut metrics = MetricSet::new();

    metrics.set_number(names::IMAGE_WIDTH, frame.width() as f64);
    metrics.set_number(names::IMAGE_HEIGHT, frame.height() as f64);
    metrics.set_number(names::BLUR_SCORE, quality::blur_score(gray));
    metrics.set_number(names::BRIGHTNESS_MEAN, quality::brightness_mean(gray));
    metrics.set_number(names::CONTRAST, quality::contrast(gray));
    metrics.set_number(names::SHARPNESS, quality::sharpness(gray));
    metrics.set_number(names::NOISE_LEVEL, quality::noise_level(gray));
    metrics.set_number(
        names::SHADOW_PERCENTAGE,
        quality::shadow_percentage(gray, config.quality.shadow_intensity_cutoff),
    );
    metrics.set_number(
        names::GLARE_SPOTS,
        quality::glare_spot_count(
            gray,
            config.quality.glare_intensity_cutoff,
            config.quality.min_glare_spot_area,
        ) as f64,
    );

    let stats = border::border_statistics(
        gray,
        config.classifier.border_ring_fraction,
        config.classifier.min_border_ring_px,
    );
    metrics.set_number(names::AVG_BORDER_STD, stats.avg_std);
    metrics.set_number(names::BORDER_MEAN, stats.mean);

    match border::document_occupancy(gray) {
        Some(occupancy) => metrics.set_number(names::DOCUMENT_OCCUPANCY, occupancy),
        None => metrics.set_absent(names::DOCUMENT_OCCUPANCY),
    }
    metrics.set_number(
        names::DOCUMENT_TILT_DEGREES,
        border::document_tilt_degrees(gray),
    );

    match landmarks.detect(frame)? {
        Some(face) if face.is_complete() => {
            debug!("face mesh detected with {} points", face.points.len());
            metrics.set_number(names::FACE_PERCENTAGE, face::face_percentage(&face));
            metrics.set_number(names::TILT_DEGREES, face::tilt_degrees(&face));
            metrics.set_number(
                names::CENTER_OFFSET_PERCENTAGE,
                face::center_offset_percentage(&face),
            );
            metrics.set_flag(names::EYES_OPEN, face::eyes_open(&face));
            metrics.set_flag(names::GAZE_ALIGNED, face::gaze_aligned(&face));
            metrics.set_flag(names::MOUTH_CLOSED, face::mouth_closed(&face, frame.height()));
            metrics.set_flag(
                names::GLASSES_DETECTED,
                face::glasses_detected(gray, &face),
            );
        }
        Some(face) => {
            warn!(
                "face mesh too sparse ({} points), treating face metrics as absent",
                face.points.len()
            );
            set_face_metrics_absent(&mut metrics);
        }
        None => {
            set_face_metrics_absent(&mut metrics);
        }
    }

    Ok(metrics)
}

fn set_face_metrics_absent(metrics: &mut MetricSet) {
    for name in [
        names::FACE_PERCENTAGE,
        names::TILT_DEGREES,
        names::CENTER_OFFSET_PERCENTAGE,
        names::EYES_OPEN,
        names::GAZE_ALIGNED,
        names::MOUTH_CLOSED,
        names::GLASSES_DETECTED,
    ] {
        metrics.set_absent(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Luma};

    #[test]
    fn metrics_without_face_are_absent_not_missing() {
        let img = image::GrayImage::from_pixel(64, 64, Luma([180u8]));
        let frame = Frame::from_image(DynamicImage::ImageLuma8(img));
        let config = EngineConfig::default();

        let metrics = compute_metrics(&frame, &NoLandmarkProvider, &config).unwrap();

        assert_eq!(metrics.number(names::IMAGE_WIDTH), Some(64.0));
        assert!(metrics.get(names::FACE_PERCENTAGE).unwrap().is_absent());
        assert!(metrics.get(names::EYES_OPEN).unwrap().is_absent());
        // Quality metrics are still present alongside the absent face set.
        assert!(metrics.number(names::BRIGHTNESS_MEAN).is_some());
        assert!(metrics.number(names::AVG_BORDER_STD).is_some());
    }
}

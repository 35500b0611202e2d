use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::utils::EngineError;

/// Static engine configuration, loaded once at process start and shared
/// read-only across requests. Every numeric threshold used by the metric
/// extractors, the scan/photo classifier, the compliance profiles, and the
/// OCR cascade lives here so it can be tuned without touching the algorithms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub quality: QualitySettings,
    pub classifier: ClassifierSettings,
    pub scan: ScanProfileSettings,
    pub photo: PhotoProfileSettings,
    pub scoring: ScoringSettings,
    pub ocr: OcrSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            quality: QualitySettings::default(),
            classifier: ClassifierSettings::default(),
            scan: ScanProfileSettings::default(),
            photo: PhotoProfileSettings::default(),
            scoring: ScoringSettings::default(),
            ocr: OcrSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file. Missing sections fall back to
    /// the built-in defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<EngineConfig, EngineError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&raw).map_err(|e| {
            EngineError::Config(format!(
                "failed to parse {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }
}

/// Image quality thresholds shared by both profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitySettings {
    /// Laplacian variance below this is considered blurry.
    pub blur_threshold: f64,
    pub min_brightness: f64,
    pub max_brightness: f64,
    pub min_contrast: f64,
    /// Warning threshold for the Laplacian-std noise estimate.
    pub max_noise_level: f64,
    /// Warning threshold for the Sobel-magnitude sharpness mean.
    pub min_sharpness: f64,
    pub min_image_width: u32,
    pub min_image_height: u32,
    /// Pixels darker than this count toward the shadow percentage.
    pub shadow_intensity_cutoff: u8,
    pub max_shadow_percentage: f64,
    /// Pixels brighter than this are glare candidates.
    pub glare_intensity_cutoff: u8,
    /// Bright connected regions smaller than this are ignored.
    pub min_glare_spot_area: u32,
}

impl Default for QualitySettings {
    fn default() -> Self {
        QualitySettings {
            blur_threshold: 100.0,
            min_brightness: 50.0,
            max_brightness: 200.0,
            min_contrast: 40.0,
            max_noise_level: 15.0,
            min_sharpness: 50.0,
            min_image_width: 1920,
            min_image_height: 1080,
            shadow_intensity_cutoff: 50,
            max_shadow_percentage: 15.0,
            glare_intensity_cutoff: 220,
            min_glare_spot_area: 100,
        }
    }
}

/// Scan-vs-photo decision constants. The cutoff and ring geometry are
/// empirically tuned; they are configuration so a labeled corpus can be used
/// to re-validate them without code changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// `avg_border_std` below this means a uniform margin, i.e. a scan.
    pub border_std_cutoff: f64,
    /// Border ring width as a fraction of the smaller frame dimension.
    pub border_ring_fraction: f64,
    /// Lower bound on the ring width in pixels.
    pub min_border_ring_px: u32,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        ClassifierSettings {
            border_std_cutoff: 15.0,
            border_ring_fraction: 0.05,
            min_border_ring_px: 4,
        }
    }
}

/// Thresholds applied when the frame is classified as a scanned document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanProfileSettings {
    pub min_document_occupancy: f64,
    pub max_document_occupancy: f64,
    pub max_document_tilt_degrees: f64,
}

impl Default for ScanProfileSettings {
    fn default() -> Self {
        ScanProfileSettings {
            min_document_occupancy: 85.0,
            max_document_occupancy: 100.0,
            max_document_tilt_degrees: 10.0,
        }
    }
}

/// Thresholds applied when the frame is classified as a photograph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoProfileSettings {
    pub min_face_percentage: f64,
    pub max_face_percentage: f64,
    pub max_tilt_degrees: f64,
    /// Face-center offset (percent of frame) above which a warning is raised.
    pub max_center_offset_percentage: f64,
    /// Minimum border-ring brightness for a light background.
    pub min_background_brightness: f64,
}

impl Default for PhotoProfileSettings {
    fn default() -> Self {
        PhotoProfileSettings {
            min_face_percentage: 70.0,
            max_face_percentage: 80.0,
            max_tilt_degrees: 10.0,
            max_center_offset_percentage: 15.0,
            min_background_brightness: 180.0,
        }
    }
}

/// Weights for deriving the 0-100 compliance score from findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub error_penalty: f64,
    pub warning_penalty: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        ScoringSettings {
            error_penalty: 15.0,
            warning_penalty: 5.0,
        }
    }
}

/// MRZ cascade constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Fraction of the frame height, measured from the bottom, that is
    /// cropped as the MRZ band. Passports carry the MRZ in roughly the
    /// bottom quarter of the bio page.
    pub mrz_band_fraction: f64,
    /// Minimum per-line confidence for an MRZ candidate line.
    pub min_line_confidence: f64,
    /// Directory containing the `.rten` detection/recognition models for the
    /// primary engine. `None` uses the ocrs default cache directory.
    pub model_dir: Option<PathBuf>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        OcrSettings {
            mrz_band_fraction: 0.25,
            min_line_confidence: 0.6,
            model_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_bands() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.classifier.border_std_cutoff, 15.0);
        assert_eq!(cfg.scan.min_document_occupancy, 85.0);
        assert_eq!(cfg.scan.max_document_occupancy, 100.0);
        assert_eq!(cfg.photo.min_face_percentage, 70.0);
        assert_eq!(cfg.photo.max_face_percentage, 80.0);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"classifier": {"border_std_cutoff": 12.5}}"#).unwrap();
        assert_eq!(cfg.classifier.border_std_cutoff, 12.5);
        assert_eq!(cfg.quality.blur_threshold, 100.0);
    }
}

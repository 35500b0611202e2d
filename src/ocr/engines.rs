use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, GrayImage};
use lazy_static::lazy_static;
use log::{debug, info};
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use tesseract::Tesseract;

use crate::config::OcrSettings;
use crate::utils::EngineError;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

const MRZ_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789<";

/// One recognized text line with a 0-1 confidence estimate.
///
/// Confidence is lexical: the share of characters that belong to the MRZ
/// alphabet. Both engines use the same estimate so cascade thresholds mean
/// the same thing regardless of which engine produced the line.
#[derive(Debug, Clone)]
pub struct OcrLine {
    pub text: String,
    pub confidence: f64,
}

/// Share of characters (ignoring whitespace) in the MRZ alphabet.
pub fn mrz_char_ratio(text: &str) -> f64 {
    let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.is_empty() {
        return 0.0;
    }
    let hits = chars
        .iter()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || **c == '<')
        .count();
    hits as f64 / chars.len() as f64
}

fn line_from_text(text: &str) -> OcrLine {
    OcrLine {
        text: text.to_string(),
        confidence: mrz_char_ratio(text),
    }
}

/// A text recognizer usable as a cascade stage.
pub trait MrzOcrEngine: Send + Sync {
    fn name(&self) -> &'static str;
    fn recognize_lines(&self, image: &GrayImage) -> Result<Vec<OcrLine>, EngineError>;
}

/// Locations of the `.rten` model files for the neural engine.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub detection: PathBuf,
    pub recognition: PathBuf,
}

fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

impl ModelPaths {
    pub fn from_dir(dir: impl AsRef<Path>) -> ModelPaths {
        let dir = dir.as_ref();
        ModelPaths {
            detection: dir.join(DETECTION_MODEL_FILENAME),
            recognition: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn resolve(model_dir: Option<&Path>) -> ModelPaths {
        match model_dir {
            Some(dir) => ModelPaths::from_dir(dir),
            None => ModelPaths::from_dir(default_model_dir()),
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        for path in [&self.detection, &self.recognition] {
            if !path.exists() {
                return Err(EngineError::Ocr(format!(
                    "OCR model not found at {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Primary engine: neural detection and recognition via `ocrs`.
///
/// Model loading is the expensive step; construct once and share via
/// [`shared_primary`].
pub struct NeuralMrzEngine {
    engine: OcrsEngine,
}

impl NeuralMrzEngine {
    pub fn new(paths: ModelPaths) -> Result<NeuralMrzEngine, EngineError> {
        paths.validate()?;

        info!("loading OCR models from {}", paths.detection.display());
        let detection_model = Model::load_file(&paths.detection).map_err(|e| {
            EngineError::Ocr(format!(
                "failed to load detection model {}: {}",
                paths.detection.display(),
                e
            ))
        })?;
        let recognition_model = Model::load_file(&paths.recognition).map_err(|e| {
            EngineError::Ocr(format!(
                "failed to load recognition model {}: {}",
                paths.recognition.display(),
                e
            ))
        })?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|e| EngineError::Ocr(format!("failed to initialize OCR engine: {}", e)))?;

        Ok(NeuralMrzEngine { engine })
    }
}

impl MrzOcrEngine for NeuralMrzEngine {
    fn name(&self) -> &'static str {
        "primary"
    }

    fn recognize_lines(&self, image: &GrayImage) -> Result<Vec<OcrLine>, EngineError> {
        let rgb = DynamicImage::ImageLuma8(image.clone()).to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height))
            .map_err(|e| EngineError::Ocr(format!("failed to build image source: {}", e)))?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|e| EngineError::Ocr(format!("OCR preprocessing failed: {}", e)))?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|e| EngineError::Ocr(format!("word detection failed: {}", e)))?;
        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        let line_texts = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|e| EngineError::Ocr(format!("line recognition failed: {}", e)))?;

        let lines: Vec<OcrLine> = line_texts
            .iter()
            .flatten()
            .map(|line| line_from_text(&line.to_string()))
            .filter(|line| !line.text.trim().is_empty())
            .collect();
        debug!("neural engine recognized {} line(s)", lines.len());
        Ok(lines)
    }
}

/// Fallback engine: classical recognition via Tesseract, restricted to the
/// MRZ character set.
pub struct TesseractMrzEngine;

impl MrzOcrEngine for TesseractMrzEngine {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn recognize_lines(&self, image: &GrayImage) -> Result<Vec<OcrLine>, EngineError> {
        // Tesseract reads from a file path, so the band goes through a
        // temporary PNG.
        let temp = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .map_err(|e| EngineError::Ocr(format!("failed to create temp file: {}", e)))?;
        image
            .save(temp.path())
            .map_err(|e| EngineError::Ocr(format!("failed to write temp image: {}", e)))?;
        let path = temp
            .path()
            .to_str()
            .ok_or_else(|| EngineError::Ocr("temp path is not valid UTF-8".to_string()))?;

        let text = Tesseract::new(None, Some("eng"))
            .map_err(|e| EngineError::Ocr(format!("tesseract init failed: {}", e)))?
            .set_image(path)
            .map_err(|e| EngineError::Ocr(format!("tesseract set_image failed: {}", e)))?
            .set_variable("tessedit_char_whitelist", MRZ_WHITELIST)
            .map_err(|e| EngineError::Ocr(format!("tesseract set_variable failed: {}", e)))?
            // 6 = assume a single uniform block of text
            .set_variable("tessedit_pageseg_mode", "6")
            .map_err(|e| EngineError::Ocr(format!("tesseract set_variable failed: {}", e)))?
            .get_text()
            .map_err(|e| EngineError::Ocr(format!("tesseract recognition failed: {}", e)))?;

        let lines: Vec<OcrLine> = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(line_from_text)
            .collect();
        debug!("tesseract recognized {} line(s)", lines.len());
        Ok(lines)
    }
}

lazy_static! {
    static ref SHARED_PRIMARY: Mutex<Option<Arc<NeuralMrzEngine>>> = Mutex::new(None);
}

/// Process-wide neural engine instance. The models are loaded on first use
/// and shared afterwards.
pub fn shared_primary(settings: &OcrSettings) -> Result<Arc<NeuralMrzEngine>, EngineError> {
    let mut guard = SHARED_PRIMARY
        .lock()
        .map_err(|_| EngineError::Ocr("OCR engine lock poisoned".to_string()))?;
    if let Some(engine) = guard.as_ref() {
        return Ok(Arc::clone(engine));
    }
    let paths = ModelPaths::resolve(settings.model_dir.as_deref());
    let engine = Arc::new(NeuralMrzEngine::new(paths)?);
    *guard = Some(Arc::clone(&engine));
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_ratio_measures_mrz_shape() {
        assert_eq!(mrz_char_ratio("P<UTOERIKSSON<<ANNA"), 1.0);
        assert_eq!(mrz_char_ratio(""), 0.0);
        assert!(mrz_char_ratio("hello world") < 0.5);
        // Whitespace does not dilute the ratio.
        assert_eq!(mrz_char_ratio("P< UTO"), 1.0);
    }

    #[test]
    fn model_paths_resolve_from_explicit_dir() {
        let paths = ModelPaths::from_dir("/opt/models");
        assert_eq!(
            paths.detection,
            PathBuf::from("/opt/models/text-detection.rten")
        );
        assert_eq!(
            paths.recognition,
            PathBuf::from("/opt/models/text-recognition.rten")
        );
    }

    #[test]
    fn missing_models_fail_validation() {
        let paths = ModelPaths::from_dir("/nonexistent/model/dir");
        assert!(NeuralMrzEngine::new(paths).is_err());
    }
}

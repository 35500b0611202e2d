use thiserror::Error;

/// Fatal failures of the current request. Expected conditions (missing face,
/// unreadable MRZ, out-of-bound metrics, failed check digits) are modeled as
/// data on the result types, not as errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("image processing error: {0}")]
    ImageProcessing(String),

    #[error("landmark detection error: {0}")]
    LandmarkDetection(String),

    #[error("OCR engine error: {0}")]
    Ocr(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

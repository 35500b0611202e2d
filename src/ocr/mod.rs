pub mod cascade;
pub mod correct;
pub mod engines;

pub use cascade::{CascadeOutcome, MrzCascade};
pub use engines::{MrzOcrEngine, NeuralMrzEngine, OcrLine, TesseractMrzEngine};

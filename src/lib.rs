pub mod config;
pub mod engine;
pub mod models;
pub mod ocr;
pub mod processing;
pub mod utils;
pub mod validation;

pub use engine::DocumentEngine;

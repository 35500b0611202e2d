pub mod frame;
pub mod metrics;
pub mod mrz;
pub mod report;

pub use frame::Frame;
pub use metrics::{MetricSet, MetricValue};
pub use mrz::{CheckDigitReport, MrzOutcome, MrzRecord};
pub use report::{
    ClassificationResult, DocumentClass, Finding, Severity, VerificationResult,
};

use serde::Serialize;

use crate::models::metrics::MetricValue;

/// Which threshold profile a frame is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentClass {
    /// Uniform border: a scanned or converted document image.
    Scan,
    /// Textured border: a photograph of a person or document.
    Photo,
}

impl std::fmt::Display for DocumentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentClass::Scan => write!(f, "scan"),
            DocumentClass::Photo => write!(f, "photo"),
        }
    }
}

/// The classifier's decision plus the border statistic that produced it.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClassificationResult {
    pub class: DocumentClass,
    pub avg_border_std: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// One evaluated rule instance with the observed value and a remediation
/// message for the end user.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub metric: String,
    pub observed: MetricValue,
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// The compliance verdict for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    pub profile: String,
    pub classification: ClassificationResult,
    pub findings: Vec<Finding>,
    /// 0-100; 100 means no findings at all.
    pub compliance_score: f64,
    /// False iff at least one error-severity finding is present.
    pub is_valid: bool,
    pub strict_mode: bool,
}

impl VerificationResult {
    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| !f.is_error())
    }
}

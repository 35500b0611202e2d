use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use log::info;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::models::metrics::names;
use crate::models::{
    ClassificationResult, DocumentClass, Frame, MetricSet, MrzOutcome, MrzRecord,
    VerificationResult,
};
use crate::ocr::cascade::CascadeOutcome;
use crate::ocr::engines::{shared_primary, MrzOcrEngine, TesseractMrzEngine};
use crate::ocr::MrzCascade;
use crate::processing::{self, LandmarkProvider, NoLandmarkProvider};
use crate::utils::EngineError;
use crate::validation::{self, evaluator, mrz};

/// Combined verdict: frame compliance plus the extracted MRZ, if any.
#[derive(Debug, Serialize)]
pub struct DocumentReport {
    pub compliance: VerificationResult,
    pub mrz: MrzOutcome,
}

/// The engine facade. Owns the configuration, the landmark provider and the
/// OCR cascade; all operations take immutable frames and are safe to call
/// from multiple threads.
pub struct DocumentEngine {
    config: EngineConfig,
    landmarks: Box<dyn LandmarkProvider>,
    cascade: MrzCascade,
}

impl DocumentEngine {
    /// Build an engine with the stock parts: the shared neural OCR engine,
    /// the Tesseract fallback, and no face landmark provider. Deployments
    /// that evaluate photos plug a provider in via [`with_parts`].
    ///
    /// [`with_parts`]: DocumentEngine::with_parts
    pub fn new(config: EngineConfig) -> Result<DocumentEngine, EngineError> {
        let primary = shared_primary(&config.ocr)?;
        Ok(DocumentEngine::with_parts(
            config,
            Box::new(NoLandmarkProvider),
            primary,
            Arc::new(TesseractMrzEngine),
        ))
    }

    /// Build an engine from explicit parts. Used by deployments with their
    /// own face mesh model and by tests with stub OCR engines.
    pub fn with_parts(
        config: EngineConfig,
        landmarks: Box<dyn LandmarkProvider>,
        primary: Arc<dyn MrzOcrEngine>,
        fallback: Arc<dyn MrzOcrEngine>,
    ) -> DocumentEngine {
        let cascade = MrzCascade::new(primary, fallback, config.ocr.clone());
        DocumentEngine {
            config,
            landmarks,
            cascade,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Extract every metric from one frame.
    pub fn compute_metrics(&self, frame: &Frame) -> Result<MetricSet, EngineError> {
        processing::compute_metrics(frame, self.landmarks.as_ref(), &self.config)
    }

    /// Score one frame against its compliance profile. The profile follows
    /// the scan/photo classification unless `class_override` pins it.
    pub fn evaluate_compliance(
        &self,
        frame: &Frame,
        class_override: Option<DocumentClass>,
        strict_mode: bool,
    ) -> Result<VerificationResult, EngineError> {
        let metrics = self.compute_metrics(frame)?;
        Ok(self.evaluate_metrics(&metrics, class_override, strict_mode))
    }

    fn evaluate_metrics(
        &self,
        metrics: &MetricSet,
        class_override: Option<DocumentClass>,
        strict_mode: bool,
    ) -> VerificationResult {
        let avg_border_std = metrics.number(names::AVG_BORDER_STD).unwrap_or(0.0);
        let classification = match class_override {
            Some(class) => ClassificationResult {
                class,
                avg_border_std,
            },
            None => validation::classify(avg_border_std, &self.config.classifier),
        };
        let profile = match classification.class {
            DocumentClass::Scan => validation::scan_profile(&self.config),
            DocumentClass::Photo => validation::photo_profile(&self.config),
        };
        evaluator::evaluate(
            metrics,
            classification,
            &profile,
            strict_mode,
            &self.config.scoring,
        )
    }

    /// Run the OCR cascade over the pages and parse the result. `NotFound`
    /// is a normal outcome; only engine failures return an error.
    pub fn extract_mrz(&self, pages: &[Frame]) -> Result<MrzOutcome, EngineError> {
        match self.cascade.run(pages)? {
            CascadeOutcome::Found { lines, source, .. } => {
                let record = mrz::parse_td3(&lines[0], &lines[1], &source);
                info!(
                    "MRZ extracted by {} engine, record valid={}",
                    source, record.is_valid
                );
                Ok(MrzOutcome::Found(record))
            }
            CascadeOutcome::NotFound => Ok(MrzOutcome::NotFound),
        }
    }

    /// Full verification: compliance of the first page plus MRZ extraction
    /// over all pages, with the expiry policy applied to the combined
    /// findings.
    pub fn verify_document(
        &self,
        pages: &[Frame],
        strict_mode: bool,
    ) -> Result<DocumentReport, EngineError> {
        self.verify_document_at(pages, strict_mode, Utc::now().date_naive())
    }

    fn verify_document_at(
        &self,
        pages: &[Frame],
        strict_mode: bool,
        today: NaiveDate,
    ) -> Result<DocumentReport, EngineError> {
        let first = pages
            .first()
            .ok_or_else(|| EngineError::ImageProcessing("no pages to verify".to_string()))?;

        let mut compliance = self.evaluate_compliance(first, None, strict_mode)?;
        let outcome = self.extract_mrz(pages)?;

        if let Some(record) = outcome.record() {
            apply_expiry_policy(&mut compliance, record, today, &self.config);
        }

        Ok(DocumentReport {
            compliance,
            mrz: outcome,
        })
    }
}

/// Fold the document's expiry state into the compliance findings and
/// recompute the score and validity.
fn apply_expiry_policy(
    compliance: &mut VerificationResult,
    record: &MrzRecord,
    today: NaiveDate,
    config: &EngineConfig,
) {
    let expiry = match mrz::parse_yymmdd(&record.expiry_date) {
        Some(date) => date,
        None => return,
    };
    let days = (expiry - today).num_days();
    if let Some(finding) = evaluator::expiry_finding(days) {
        compliance.findings.push(finding);
        compliance.compliance_score =
            evaluator::score(&compliance.findings, &config.scoring);
        compliance.is_valid = if compliance.strict_mode {
            compliance.findings.is_empty()
        } else {
            !compliance.findings.iter().any(|f| f.is_error())
        };
    }
}

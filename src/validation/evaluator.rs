use log::info;

use crate::config::ScoringSettings;
use crate::models::metrics::names;
use crate::models::{
    ClassificationResult, Finding, MetricSet, MetricValue, Severity, VerificationResult,
};
use crate::validation::profile::{Check, ComplianceProfile, Rule};

const FACE_METRICS: &[&str] = &[
    names::FACE_PERCENTAGE,
    names::TILT_DEGREES,
    names::CENTER_OFFSET_PERCENTAGE,
    names::EYES_OPEN,
    names::GAZE_ALIGNED,
    names::MOUTH_CLOSED,
    names::GLASSES_DETECTED,
];

fn format_number(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{:.1}", value)
    }
}

fn render_message(rule: &Rule, value: &MetricValue) -> String {
    let mut message = rule.message.to_string();
    if let Some(v) = value.as_number() {
        message = message.replace("{value}", &format_number(v));
    }
    match rule.check {
        Check::AtLeast(min) => message = message.replace("{min}", &format_number(min)),
        Check::AtMost(max) => message = message.replace("{max}", &format_number(max)),
        Check::Between(min, max) => {
            message = message
                .replace("{min}", &format_number(min))
                .replace("{max}", &format_number(max));
        }
        Check::IsTrue | Check::IsFalse => {}
    }
    message
}

fn absent_finding(rule: &Rule) -> Finding {
    let message = if FACE_METRICS.contains(&rule.metric) {
        "no face detected".to_string()
    } else {
        format!("metric {} unavailable", rule.metric)
    };
    Finding {
        metric: rule.metric.to_string(),
        observed: MetricValue::Absent,
        severity: Severity::Error,
        message,
    }
}

/// Evaluate every rule of the profile against the metric set.
///
/// No rule short-circuits evaluation: the caller always gets the complete
/// finding list. An absent or missing metric is itself an error finding.
/// In strict mode warnings still score as warnings but any finding at all
/// makes the result invalid.
pub fn evaluate(
    metrics: &MetricSet,
    classification: ClassificationResult,
    profile: &ComplianceProfile,
    strict_mode: bool,
    scoring: &ScoringSettings,
) -> VerificationResult {
    let mut findings = Vec::new();

    for rule in &profile.rules {
        match metrics.get(rule.metric) {
            None | Some(MetricValue::Absent) => findings.push(absent_finding(rule)),
            Some(value @ MetricValue::Flag(flag)) => {
                if !rule.check.passes_flag(*flag) {
                    findings.push(Finding {
                        metric: rule.metric.to_string(),
                        observed: *value,
                        severity: rule.severity,
                        message: render_message(rule, value),
                    });
                }
            }
            Some(value @ MetricValue::Number(number)) => {
                if !rule.check.passes_number(*number) {
                    findings.push(Finding {
                        metric: rule.metric.to_string(),
                        observed: *value,
                        severity: rule.severity,
                        message: render_message(rule, value),
                    });
                }
            }
        }
    }

    let compliance_score = score(&findings, scoring);
    let is_valid = if strict_mode {
        findings.is_empty()
    } else {
        !findings.iter().any(Finding::is_error)
    };

    info!(
        "profile {}: {} finding(s), score {:.0}, valid={}",
        profile.name,
        findings.len(),
        compliance_score,
        is_valid
    );

    VerificationResult {
        profile: profile.name.to_string(),
        classification,
        findings,
        compliance_score,
        is_valid,
        strict_mode,
    }
}

/// 100 minus per-finding penalties, clamped to 0. Strict mode does not
/// change the weights, only the validity decision.
pub fn score(findings: &[Finding], scoring: &ScoringSettings) -> f64 {
    let penalty: f64 = findings
        .iter()
        .map(|f| match f.severity {
            Severity::Error => scoring.error_penalty,
            Severity::Warning => scoring.warning_penalty,
        })
        .sum();
    (100.0 - penalty).max(0.0)
}

/// Post-parse expiry policy for a combined document verification. Expiry is
/// a document-state concern, not an MRZ integrity concern, so it is applied
/// here rather than inside the MRZ record's validity flag.
pub fn expiry_finding(days_until_expiry: i64) -> Option<Finding> {
    if days_until_expiry < 0 {
        Some(Finding {
            metric: names::DAYS_UNTIL_EXPIRY.to_string(),
            observed: MetricValue::Number(days_until_expiry as f64),
            severity: Severity::Error,
            message: format!("document expired {} day(s) ago", -days_until_expiry),
        })
    } else if days_until_expiry <= 180 {
        Some(Finding {
            metric: names::DAYS_UNTIL_EXPIRY.to_string(),
            observed: MetricValue::Number(days_until_expiry as f64),
            severity: Severity::Warning,
            message: format!("document expires in {} day(s)", days_until_expiry),
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::models::DocumentClass;
    use crate::validation::profile::{photo_profile, scan_profile};

    fn scan_classification() -> ClassificationResult {
        ClassificationResult {
            class: DocumentClass::Scan,
            avg_border_std: 3.0,
        }
    }

    fn photo_classification() -> ClassificationResult {
        ClassificationResult {
            class: DocumentClass::Photo,
            avg_border_std: 42.0,
        }
    }

    fn passing_scan_metrics(config: &EngineConfig) -> MetricSet {
        let mut m = MetricSet::new();
        m.set_number(names::DOCUMENT_OCCUPANCY, 92.0);
        m.set_number(names::DOCUMENT_TILT_DEGREES, 1.5);
        m.set_number(names::BLUR_SCORE, 250.0);
        m.set_number(names::BRIGHTNESS_MEAN, 140.0);
        m.set_number(names::CONTRAST, 55.0);
        m.set_number(names::IMAGE_WIDTH, 2480.0);
        m.set_number(names::IMAGE_HEIGHT, 3508.0);
        m.set_number(names::SHADOW_PERCENTAGE, 2.0);
        m.set_number(names::GLARE_SPOTS, 0.0);
        m.set_number(names::SHARPNESS, config.quality.min_sharpness + 10.0);
        m.set_number(names::NOISE_LEVEL, 5.0);
        m
    }

    #[test]
    fn clean_scan_scores_full_marks() {
        let config = EngineConfig::default();
        let metrics = passing_scan_metrics(&config);
        let result = evaluate(
            &metrics,
            scan_classification(),
            &scan_profile(&config),
            false,
            &config.scoring,
        );
        assert!(result.is_valid);
        assert!(result.findings.is_empty());
        assert_eq!(result.compliance_score, 100.0);
    }

    #[test]
    fn one_rule_failure_does_not_stop_the_rest() {
        let config = EngineConfig::default();
        let mut metrics = passing_scan_metrics(&config);
        metrics.set_number(names::DOCUMENT_OCCUPANCY, 40.0);
        metrics.set_number(names::BLUR_SCORE, 10.0);

        let result = evaluate(
            &metrics,
            scan_classification(),
            &scan_profile(&config),
            false,
            &config.scoring,
        );
        assert!(!result.is_valid);
        assert_eq!(result.errors().count(), 2);
        assert_eq!(result.compliance_score, 70.0);
    }

    #[test]
    fn scan_framing_fails_under_the_photo_profile() {
        // A well-framed scan evaluated against the photo band shows how a
        // misclassification cascades into spurious rejections.
        let config = EngineConfig::default();
        let mut metrics = passing_scan_metrics(&config);
        metrics.set_number(names::FACE_PERCENTAGE, 99.0);
        metrics.set_number(names::TILT_DEGREES, 0.0);
        metrics.set_number(names::CENTER_OFFSET_PERCENTAGE, 1.0);
        metrics.set_flag(names::EYES_OPEN, true);
        metrics.set_flag(names::GAZE_ALIGNED, true);
        metrics.set_flag(names::MOUTH_CLOSED, true);
        metrics.set_flag(names::GLASSES_DETECTED, false);
        metrics.set_number(names::BORDER_MEAN, 250.0);

        let result = evaluate(
            &metrics,
            photo_classification(),
            &photo_profile(&config),
            false,
            &config.scoring,
        );
        assert!(!result.is_valid);
        let framing: Vec<_> = result
            .findings
            .iter()
            .filter(|f| f.metric == names::FACE_PERCENTAGE)
            .collect();
        assert_eq!(framing.len(), 1);
        assert!(framing[0].is_error());
        assert!(framing[0].message.contains("99"));
    }

    #[test]
    fn absent_face_metrics_raise_errors() {
        let config = EngineConfig::default();
        let mut metrics = passing_scan_metrics(&config);
        for name in FACE_METRICS {
            metrics.set_absent(name);
        }
        metrics.set_number(names::BORDER_MEAN, 200.0);

        let result = evaluate(
            &metrics,
            photo_classification(),
            &photo_profile(&config),
            false,
            &config.scoring,
        );
        assert!(!result.is_valid);
        assert!(result
            .findings
            .iter()
            .any(|f| f.message == "no face detected" && f.is_error()));
    }

    #[test]
    fn strict_mode_invalidates_on_warnings_without_changing_score() {
        let config = EngineConfig::default();
        let mut metrics = passing_scan_metrics(&config);
        metrics.set_number(names::NOISE_LEVEL, 30.0);

        let relaxed = evaluate(
            &metrics,
            scan_classification(),
            &scan_profile(&config),
            false,
            &config.scoring,
        );
        let strict = evaluate(
            &metrics,
            scan_classification(),
            &scan_profile(&config),
            true,
            &config.scoring,
        );

        assert!(relaxed.is_valid);
        assert!(!strict.is_valid);
        assert_eq!(relaxed.compliance_score, strict.compliance_score);
        assert_eq!(strict.compliance_score, 95.0);
    }

    #[test]
    fn score_clamps_at_zero() {
        let config = EngineConfig::default();
        let findings: Vec<Finding> = (0..10)
            .map(|i| Finding {
                metric: format!("m{}", i),
                observed: MetricValue::Number(0.0),
                severity: Severity::Error,
                message: String::new(),
            })
            .collect();
        assert_eq!(score(&findings, &config.scoring), 0.0);
    }

    #[test]
    fn expiry_policy_tiers() {
        assert!(expiry_finding(365).is_none());
        let soon = expiry_finding(30).unwrap();
        assert_eq!(soon.severity, Severity::Warning);
        let expired = expiry_finding(-5).unwrap();
        assert!(expired.is_error());
    }
}

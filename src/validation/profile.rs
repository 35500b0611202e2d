use crate::config::EngineConfig;
use crate::models::metrics::names;
use crate::models::Severity;

/// Predicate a rule applies to its metric's value.
#[derive(Debug, Clone, Copy)]
pub enum Check {
    AtLeast(f64),
    AtMost(f64),
    Between(f64, f64),
    IsTrue,
    IsFalse,
}

impl Check {
    pub fn passes_number(&self, value: f64) -> bool {
        match *self {
            Check::AtLeast(min) => value >= min,
            Check::AtMost(max) => value <= max,
            Check::Between(min, max) => value >= min && value <= max,
            Check::IsTrue => value != 0.0,
            Check::IsFalse => value == 0.0,
        }
    }

    pub fn passes_flag(&self, value: bool) -> bool {
        match *self {
            Check::IsTrue => value,
            Check::IsFalse => !value,
            _ => self.passes_number(if value { 1.0 } else { 0.0 }),
        }
    }
}

/// One compliance rule: a metric, the band it must sit in, and the user
/// message raised when it does not.
#[derive(Debug, Clone)]
pub struct Rule {
    pub metric: &'static str,
    pub check: Check,
    pub severity: Severity,
    /// Message template. `{value}`, `{min}` and `{max}` are substituted
    /// when the finding is built.
    pub message: &'static str,
}

/// A named, ordered rule table. Rules are data so the two profiles differ
/// only in their tables, not in evaluation code.
#[derive(Debug, Clone)]
pub struct ComplianceProfile {
    pub name: &'static str,
    pub rules: Vec<Rule>,
}

fn shared_quality_rules(config: &EngineConfig) -> Vec<Rule> {
    let q = &config.quality;
    vec![
        Rule {
            metric: names::BLUR_SCORE,
            check: Check::AtLeast(q.blur_threshold),
            severity: Severity::Error,
            message: "image is too blurry (score {value}, minimum {min})",
        },
        Rule {
            metric: names::BRIGHTNESS_MEAN,
            check: Check::Between(q.min_brightness, q.max_brightness),
            severity: Severity::Error,
            message: "brightness {value} outside acceptable range {min}-{max}",
        },
        Rule {
            metric: names::CONTRAST,
            check: Check::AtLeast(q.min_contrast),
            severity: Severity::Error,
            message: "contrast {value} below minimum {min}",
        },
        Rule {
            metric: names::IMAGE_WIDTH,
            check: Check::AtLeast(q.min_image_width as f64),
            severity: Severity::Error,
            message: "image width {value}px below minimum {min}px",
        },
        Rule {
            metric: names::IMAGE_HEIGHT,
            check: Check::AtLeast(q.min_image_height as f64),
            severity: Severity::Error,
            message: "image height {value}px below minimum {min}px",
        },
        Rule {
            metric: names::SHADOW_PERCENTAGE,
            check: Check::AtMost(q.max_shadow_percentage),
            severity: Severity::Error,
            message: "shadows cover {value}% of the image, maximum {max}%",
        },
        Rule {
            metric: names::GLARE_SPOTS,
            check: Check::AtMost(0.0),
            severity: Severity::Error,
            message: "{value} glare spot(s) detected, remove reflections",
        },
        Rule {
            metric: names::SHARPNESS,
            check: Check::AtLeast(q.min_sharpness),
            severity: Severity::Warning,
            message: "sharpness {value} below recommended minimum {min}",
        },
        Rule {
            metric: names::NOISE_LEVEL,
            check: Check::AtMost(q.max_noise_level),
            severity: Severity::Warning,
            message: "noise level {value} above recommended maximum {max}",
        },
    ]
}

/// Rule table for scanned or converted documents.
pub fn scan_profile(config: &EngineConfig) -> ComplianceProfile {
    let s = &config.scan;
    let mut rules = vec![
        Rule {
            metric: names::DOCUMENT_OCCUPANCY,
            check: Check::Between(s.min_document_occupancy, s.max_document_occupancy),
            severity: Severity::Error,
            message: "document fills {value}% of the frame, expected {min}-{max}%",
        },
        Rule {
            metric: names::DOCUMENT_TILT_DEGREES,
            check: Check::AtMost(s.max_document_tilt_degrees),
            severity: Severity::Error,
            message: "document tilted {value} degrees, maximum {max}",
        },
    ];
    rules.extend(shared_quality_rules(config));
    ComplianceProfile {
        name: "scan",
        rules,
    }
}

/// Rule table for photographs of a person.
pub fn photo_profile(config: &EngineConfig) -> ComplianceProfile {
    let p = &config.photo;
    let mut rules = vec![
        Rule {
            metric: names::FACE_PERCENTAGE,
            check: Check::Between(p.min_face_percentage, p.max_face_percentage),
            severity: Severity::Error,
            message: "face fills {value}% of the frame, expected {min}-{max}%",
        },
        Rule {
            metric: names::TILT_DEGREES,
            check: Check::AtMost(p.max_tilt_degrees),
            severity: Severity::Error,
            message: "head tilted {value} degrees, maximum {max}",
        },
        Rule {
            metric: names::EYES_OPEN,
            check: Check::IsTrue,
            severity: Severity::Error,
            message: "eyes must be open",
        },
        Rule {
            metric: names::GAZE_ALIGNED,
            check: Check::IsTrue,
            severity: Severity::Error,
            message: "subject must look straight at the camera",
        },
        Rule {
            metric: names::MOUTH_CLOSED,
            check: Check::IsTrue,
            severity: Severity::Error,
            message: "mouth must be closed",
        },
        Rule {
            metric: names::GLASSES_DETECTED,
            check: Check::IsFalse,
            severity: Severity::Warning,
            message: "glasses detected, remove them if possible",
        },
        Rule {
            metric: names::CENTER_OFFSET_PERCENTAGE,
            check: Check::AtMost(p.max_center_offset_percentage),
            severity: Severity::Warning,
            message: "face is {value}% off center, maximum {max}%",
        },
        Rule {
            metric: names::BORDER_MEAN,
            check: Check::AtLeast(p.min_background_brightness),
            severity: Severity::Warning,
            message: "background brightness {value} below recommended {min}",
        },
    ];
    rules.extend(shared_quality_rules(config));
    ComplianceProfile {
        name: "photo",
        rules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_check_is_boundary_inclusive() {
        let check = Check::Between(70.0, 80.0);
        assert!(check.passes_number(70.0));
        assert!(check.passes_number(80.0));
        assert!(!check.passes_number(69.9));
        assert!(!check.passes_number(80.1));
    }

    #[test]
    fn flag_checks_match_booleans() {
        assert!(Check::IsTrue.passes_flag(true));
        assert!(!Check::IsTrue.passes_flag(false));
        assert!(Check::IsFalse.passes_flag(false));
    }

    #[test]
    fn profiles_cover_their_signature_metrics() {
        let config = EngineConfig::default();
        let scan = scan_profile(&config);
        let photo = photo_profile(&config);

        assert!(scan.rules.iter().any(|r| r.metric == names::DOCUMENT_OCCUPANCY));
        assert!(!scan.rules.iter().any(|r| r.metric == names::FACE_PERCENTAGE));
        assert!(photo.rules.iter().any(|r| r.metric == names::FACE_PERCENTAGE));
        assert!(photo.rules.iter().any(|r| r.metric == names::EYES_OPEN));
    }
}

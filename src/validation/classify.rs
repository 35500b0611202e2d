use log::debug;

use crate::config::ClassifierSettings;
use crate::models::{ClassificationResult, DocumentClass};

/// Decide scan vs photo from the border-ring standard deviation.
///
/// A converted scan sits on a synthetic flat margin, so its border std is
/// near zero; a photograph's background always carries texture. Values
/// exactly at the cutoff classify as photo.
pub fn classify(avg_border_std: f64, settings: &ClassifierSettings) -> ClassificationResult {
    let class = if avg_border_std < settings.border_std_cutoff {
        DocumentClass::Scan
    } else {
        DocumentClass::Photo
    };
    debug!(
        "classified frame as {} (avg_border_std={:.2}, cutoff={:.2})",
        class, avg_border_std, settings.border_std_cutoff
    );
    ClassificationResult {
        class,
        avg_border_std,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_border_is_a_scan() {
        let settings = ClassifierSettings::default();
        assert_eq!(classify(0.0, &settings).class, DocumentClass::Scan);
        assert_eq!(classify(14.9, &settings).class, DocumentClass::Scan);
    }

    #[test]
    fn cutoff_value_is_a_photo() {
        let settings = ClassifierSettings::default();
        assert_eq!(classify(15.0, &settings).class, DocumentClass::Photo);
        assert_eq!(classify(80.0, &settings).class, DocumentClass::Photo);
    }
}

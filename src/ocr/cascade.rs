use std::sync::Arc;

use image::GrayImage;
use imageproc::contrast::equalize_histogram;
use imageproc::filter::median_filter;
use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;

use crate::config::OcrSettings;
use crate::models::Frame;
use crate::ocr::correct;
use crate::ocr::engines::{MrzOcrEngine, OcrLine};
use crate::utils::EngineError;

const TD3_LINE_LEN: usize = 44;
/// Normalized lines shorter than this cannot be a TD3 line even after
/// padding; OCR that lost a third of the line is not recoverable.
const MIN_CANDIDATE_LEN: usize = 30;

/// Which stage the cascade is executing. The fallback stage only runs when
/// the primary stage produced no usable line pair or failed outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CascadeState {
    AttemptPrimary,
    AttemptFallback,
}

/// Terminal result of the cascade over a set of pages.
#[derive(Debug, Clone)]
pub enum CascadeOutcome {
    Found {
        lines: [String; 2],
        confidence: f64,
        source: String,
    },
    NotFound,
}

/// Crop the bottom band of the frame and prepare it for recognition.
/// Histogram equalization recovers contrast on washed-out scans, the median
/// filter knocks out salt-and-pepper noise without softening glyph edges.
pub fn prepare_mrz_band(gray: &GrayImage, band_fraction: f64) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }
    let band_height = ((height as f64 * band_fraction) as u32).clamp(1, height);
    let band =
        image::imageops::crop_imm(gray, 0, height - band_height, width, band_height).to_image();
    median_filter(&equalize_histogram(&band), 1, 1)
}

fn pad_to_td3(line: &str) -> String {
    let mut out: String = line.chars().take(TD3_LINE_LEN).collect();
    while out.len() < TD3_LINE_LEN {
        out.push('<');
    }
    out
}

lazy_static! {
    /// Nine document-number characters followed by their check digit.
    static ref DATA_LINE: Regex = Regex::new(r"^[A-Z0-9<]{9}[0-9]").unwrap();
}

fn digit_count(line: &str) -> usize {
    line.chars().filter(|c| c.is_ascii_digit()).count()
}

/// Pick the two TD3 lines out of the recognized text.
///
/// The first line starts with the `P<` document prefix; the second is the
/// digit-heavy data line. Both must be present: ordinary printed text in
/// the band (headers, security print) also survives the confidence filter,
/// so a missing heuristic means no MRZ, not a relaxed match. When a page
/// carries repeated candidates the last occurrence wins, matching the
/// physical MRZ position at the bottom of the page.
pub fn select_line_pair(lines: &[OcrLine], min_confidence: f64) -> Option<[String; 2]> {
    let candidates: Vec<String> = lines
        .iter()
        .filter(|l| l.confidence >= min_confidence)
        .map(|l| correct::normalize_line(&l.text))
        .filter(|l| l.len() >= MIN_CANDIDATE_LEN)
        .collect();

    let line1 = candidates.iter().rev().find(|l| l.starts_with("P<"))?;
    let line2 = candidates
        .iter()
        .rev()
        .find(|l| !l.starts_with("P<") && DATA_LINE.is_match(l) && digit_count(l) >= 5)?;

    Some([
        correct::repair_line1(&pad_to_td3(line1)),
        correct::repair_line2(&pad_to_td3(line2)),
    ])
}

fn pair_confidence(lines: &[OcrLine], min_confidence: f64) -> f64 {
    lines
        .iter()
        .map(|l| l.confidence)
        .filter(|c| *c >= min_confidence)
        .fold(f64::NAN, f64::min)
        .max(min_confidence)
}

/// Two-stage MRZ text extraction over one or more pages.
pub struct MrzCascade {
    primary: Arc<dyn MrzOcrEngine>,
    fallback: Arc<dyn MrzOcrEngine>,
    settings: OcrSettings,
}

impl MrzCascade {
    pub fn new(
        primary: Arc<dyn MrzOcrEngine>,
        fallback: Arc<dyn MrzOcrEngine>,
        settings: OcrSettings,
    ) -> MrzCascade {
        MrzCascade {
            primary,
            fallback,
            settings,
        }
    }

    /// Run the cascade over every page in order. The first page with a
    /// usable line pair wins; remaining pages are not processed.
    pub fn run(&self, pages: &[Frame]) -> Result<CascadeOutcome, EngineError> {
        for (index, page) in pages.iter().enumerate() {
            if let Some(outcome) = self.run_page(page)? {
                info!("MRZ found on page {}", index + 1);
                return Ok(outcome);
            }
        }
        Ok(CascadeOutcome::NotFound)
    }

    fn run_page(&self, page: &Frame) -> Result<Option<CascadeOutcome>, EngineError> {
        let band = prepare_mrz_band(page.gray(), self.settings.mrz_band_fraction);
        let mut state = CascadeState::AttemptPrimary;

        loop {
            match state {
                CascadeState::AttemptPrimary => {
                    // Primary engine failures are recoverable: log and hand
                    // the page to the fallback stage.
                    match self.attempt_primary(page, &band) {
                        Ok(Some(outcome)) => return Ok(Some(outcome)),
                        Ok(None) => state = CascadeState::AttemptFallback,
                        Err(e) => {
                            warn!("primary OCR engine failed: {}", e);
                            state = CascadeState::AttemptFallback;
                        }
                    }
                }
                CascadeState::AttemptFallback => {
                    // A fallback failure means no engine is left to try.
                    let lines = self.fallback.recognize_lines(&band)?;
                    return Ok(self.outcome_from(&lines, self.fallback.name()));
                }
            }
        }
    }

    fn attempt_primary(
        &self,
        page: &Frame,
        band: &GrayImage,
    ) -> Result<Option<CascadeOutcome>, EngineError> {
        let band_lines = self.primary.recognize_lines(band)?;
        if let Some(outcome) = self.outcome_from(&band_lines, self.primary.name()) {
            return Ok(Some(outcome));
        }
        // The band crop can miss an MRZ printed unusually high; retry on
        // the whole page before giving up on this engine.
        let full_lines = self.primary.recognize_lines(page.gray())?;
        Ok(self.outcome_from(&full_lines, self.primary.name()))
    }

    fn outcome_from(&self, lines: &[OcrLine], source: &str) -> Option<CascadeOutcome> {
        let pair = select_line_pair(lines, self.settings.min_line_confidence)?;
        Some(CascadeOutcome::Found {
            lines: pair,
            confidence: pair_confidence(lines, self.settings.min_line_confidence),
            source: source.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Luma};

    const LINE1: &str = "P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<";
    const LINE2: &str = "L898902C36UTO7408122F1204159ZE184226B<<<<<10";

    fn blank_page() -> Frame {
        let img = image::GrayImage::from_pixel(120, 160, Luma([200u8]));
        Frame::from_image(DynamicImage::ImageLuma8(img))
    }

    fn ocr_lines(texts: &[&str]) -> Vec<OcrLine> {
        texts
            .iter()
            .map(|t| OcrLine {
                text: t.to_string(),
                confidence: crate::ocr::engines::mrz_char_ratio(t),
            })
            .collect()
    }

    struct StubEngine {
        name: &'static str,
        lines: Result<Vec<&'static str>, &'static str>,
    }

    impl MrzOcrEngine for StubEngine {
        fn name(&self) -> &'static str {
            self.name
        }

        fn recognize_lines(&self, _image: &GrayImage) -> Result<Vec<OcrLine>, EngineError> {
            match &self.lines {
                Ok(texts) => Ok(ocr_lines(texts)),
                Err(msg) => Err(EngineError::Ocr(msg.to_string())),
            }
        }
    }

    fn cascade(primary: StubEngine, fallback: StubEngine) -> MrzCascade {
        MrzCascade::new(
            Arc::new(primary),
            Arc::new(fallback),
            OcrSettings::default(),
        )
    }

    #[test]
    fn pair_selection_skips_surrounding_text() {
        let lines = ocr_lines(&["REPUBLIC OF UTOPIA ministry of interior", LINE1, LINE2]);
        let pair = select_line_pair(&lines, 0.6).expect("pair should be found");
        assert_eq!(pair[0], LINE1);
        assert_eq!(pair[1], LINE2);
    }

    #[test]
    fn plain_text_lines_are_never_paired() {
        // Long uppercase print passes the confidence and length filters but
        // matches neither line heuristic; it must not be taken as an MRZ.
        let lines = ocr_lines(&[
            "REPUBLIC OF UTOPIA PASSPORT OFFICE DIVISION",
            "AUTHORIZED BY THE MINISTRY OF THE INTERIOR",
        ]);
        assert!(select_line_pair(&lines, 0.6).is_none());
    }

    #[test]
    fn plain_text_page_reaches_the_fallback_stage() {
        let cascade = cascade(
            StubEngine {
                name: "primary",
                lines: Ok(vec![
                    "REPUBLIC OF UTOPIA PASSPORT OFFICE DIVISION",
                    "AUTHORIZED BY THE MINISTRY OF THE INTERIOR",
                ]),
            },
            StubEngine {
                name: "fallback",
                lines: Ok(vec![LINE1, LINE2]),
            },
        );
        match cascade.run(&[blank_page()]).unwrap() {
            CascadeOutcome::Found { source, .. } => assert_eq!(source, "fallback"),
            CascadeOutcome::NotFound => panic!("expected the fallback to find the MRZ"),
        }
    }

    #[test]
    fn half_pair_is_not_found() {
        // A P< line with no data line (or vice versa) is not an MRZ.
        let lines = ocr_lines(&[LINE1, "AUTHORIZED BY THE MINISTRY OF THE INTERIOR"]);
        assert!(select_line_pair(&lines, 0.6).is_none());
        let lines = ocr_lines(&["REPUBLIC OF UTOPIA PASSPORT OFFICE DIVISION", LINE2]);
        assert!(select_line_pair(&lines, 0.6).is_none());
    }

    #[test]
    fn low_confidence_lines_are_ignored() {
        let noisy = "p<uto~~~!! garbled @@@ line with junk characters";
        let lines = ocr_lines(&[noisy]);
        assert!(select_line_pair(&lines, 0.6).is_none());
    }

    #[test]
    fn primary_success_skips_fallback() {
        let cascade = cascade(
            StubEngine {
                name: "primary",
                lines: Ok(vec![LINE1, LINE2]),
            },
            StubEngine {
                name: "fallback",
                lines: Err("fallback must not run"),
            },
        );
        match cascade.run(&[blank_page()]).unwrap() {
            CascadeOutcome::Found { source, lines, .. } => {
                assert_eq!(source, "primary");
                assert_eq!(lines[0], LINE1);
            }
            CascadeOutcome::NotFound => panic!("expected a found outcome"),
        }
    }

    #[test]
    fn primary_failure_falls_through_to_fallback() {
        let cascade = cascade(
            StubEngine {
                name: "primary",
                lines: Err("model exploded"),
            },
            StubEngine {
                name: "fallback",
                lines: Ok(vec![LINE1, LINE2]),
            },
        );
        match cascade.run(&[blank_page()]).unwrap() {
            CascadeOutcome::Found { source, .. } => assert_eq!(source, "fallback"),
            CascadeOutcome::NotFound => panic!("expected fallback to find the MRZ"),
        }
    }

    #[test]
    fn fallback_failure_propagates() {
        let cascade = cascade(
            StubEngine {
                name: "primary",
                lines: Ok(vec!["no mrz on this page"]),
            },
            StubEngine {
                name: "fallback",
                lines: Err("tesseract missing"),
            },
        );
        assert!(cascade.run(&[blank_page()]).is_err());
    }

    #[test]
    fn pages_without_mrz_yield_not_found() {
        let cascade = cascade(
            StubEngine {
                name: "primary",
                lines: Ok(vec!["chapter one", "it was a dark and stormy night"]),
            },
            StubEngine {
                name: "fallback",
                lines: Ok(vec![]),
            },
        );
        let pages = vec![blank_page(), blank_page(), blank_page()];
        match cascade.run(&pages).unwrap() {
            CascadeOutcome::NotFound => {}
            CascadeOutcome::Found { .. } => panic!("expected not found"),
        }
    }

    #[test]
    fn band_crop_keeps_requested_fraction() {
        let img = image::GrayImage::from_pixel(100, 200, Luma([128u8]));
        let band = prepare_mrz_band(&img, 0.25);
        assert_eq!(band.height(), 50);
        assert_eq!(band.width(), 100);
    }

    #[test]
    fn empty_frame_band_does_not_panic() {
        let img = image::GrayImage::new(0, 0);
        let band = prepare_mrz_band(&img, 0.25);
        assert_eq!(band.dimensions(), (0, 0));
    }
}

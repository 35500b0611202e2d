use std::collections::BTreeMap;

use serde::Serialize;

/// Canonical metric names referenced by the compliance rule tables.
pub mod names {
    pub const BLUR_SCORE: &str = "blur_score";
    pub const BRIGHTNESS_MEAN: &str = "brightness_mean";
    pub const CONTRAST: &str = "contrast";
    pub const SHARPNESS: &str = "sharpness";
    pub const NOISE_LEVEL: &str = "noise_level";
    pub const IMAGE_WIDTH: &str = "image_width";
    pub const IMAGE_HEIGHT: &str = "image_height";
    pub const SHADOW_PERCENTAGE: &str = "shadow_percentage";
    pub const GLARE_SPOTS: &str = "glare_spots";
    pub const AVG_BORDER_STD: &str = "avg_border_std";
    pub const BORDER_MEAN: &str = "border_mean";
    pub const DOCUMENT_OCCUPANCY: &str = "document_occupancy";
    pub const DOCUMENT_TILT_DEGREES: &str = "document_tilt_degrees";
    pub const FACE_PERCENTAGE: &str = "face_percentage";
    pub const TILT_DEGREES: &str = "tilt_degrees";
    pub const CENTER_OFFSET_PERCENTAGE: &str = "center_offset_percentage";
    pub const EYES_OPEN: &str = "eyes_open";
    pub const GAZE_ALIGNED: &str = "gaze_aligned";
    pub const MOUTH_CLOSED: &str = "mouth_closed";
    pub const GLASSES_DETECTED: &str = "glasses_detected";
    pub const DAYS_UNTIL_EXPIRY: &str = "days_until_expiry";
}

/// A single extracted signal. `Absent` means the extractor ran but could not
/// produce the metric (e.g. no face in the frame). It is deliberately a
/// distinct variant: a measured 0.0 is a legitimate failing value, absence is
/// a different error condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Flag(bool),
    Absent,
}

impl MetricValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetricValue::Number(v) => Some(*v),
            MetricValue::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
            MetricValue::Absent => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            MetricValue::Flag(b) => Some(*b),
            MetricValue::Number(v) => Some(*v != 0.0),
            MetricValue::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, MetricValue::Absent)
    }
}

/// The quantitative signals computed from one frame. Produced once per
/// frame by the metric extractors and read-only afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricSet {
    values: BTreeMap<String, MetricValue>,
}

impl MetricSet {
    pub fn new() -> MetricSet {
        MetricSet::default()
    }

    pub fn set_number(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), MetricValue::Number(value));
    }

    pub fn set_flag(&mut self, name: &str, value: bool) {
        self.values.insert(name.to_string(), MetricValue::Flag(value));
    }

    pub fn set_absent(&mut self, name: &str) {
        self.values.insert(name.to_string(), MetricValue::Absent);
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.values.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(|v| v.as_number())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

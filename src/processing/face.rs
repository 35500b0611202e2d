use image::GrayImage;
use imageproc::edges::canny;

use crate::models::Frame;
use crate::utils::EngineError;

/// Landmark indices in the 468-point face mesh layout.
mod mesh {
    pub const LEFT_EYE_OUTER: usize = 33;
    pub const RIGHT_EYE_OUTER: usize = 263;
    pub const NOSE_TIP: usize = 1;
    pub const FACE_LEFT_EDGE: usize = 234;
    pub const FACE_RIGHT_EDGE: usize = 454;
    pub const UPPER_LIP: usize = 13;
    pub const LOWER_LIP: usize = 14;

    /// Six-point eye contours used for the aspect-ratio openness test.
    pub const LEFT_EYE_RING: [usize; 6] = [33, 160, 158, 133, 153, 144];
    pub const RIGHT_EYE_RING: [usize; 6] = [362, 385, 387, 263, 373, 380];

    pub const POINT_COUNT: usize = 468;
}

/// Eye aspect ratio below this means the eye is closed.
const EYE_OPEN_RATIO: f64 = 0.2;
/// Nose offset from the face midline, as a fraction of face width, above
/// which the gaze is considered averted.
const GAZE_OFFSET_LIMIT: f64 = 0.05;
/// Lip gap in pixels above which the mouth is considered open.
const MOUTH_GAP_PX: f64 = 10.0;
/// Edge pixel count in the eye band above which glasses are assumed.
const GLASSES_EDGE_COUNT: usize = 200;

/// One face-mesh point in normalized frame coordinates (0.0 to 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
}

/// A detected face as a dense landmark mesh. Geometry helpers require the
/// full 468-point layout; a sparser mesh yields absent metrics.
#[derive(Debug, Clone)]
pub struct FaceLandmarks {
    pub points: Vec<Landmark>,
}

impl FaceLandmarks {
    pub fn is_complete(&self) -> bool {
        self.points.len() >= mesh::POINT_COUNT
    }

    fn point(&self, index: usize) -> Landmark {
        self.points[index]
    }
}

/// Source of face landmarks for a frame. The engine itself is detector
/// agnostic; deployments plug in whichever mesh model they run.
pub trait LandmarkProvider: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Option<FaceLandmarks>, EngineError>;
}

/// Provider for deployments without a face model. Every photo frame then
/// reports its face metrics as absent, which the evaluator turns into
/// "no face detected" findings.
pub struct NoLandmarkProvider;

impl LandmarkProvider for NoLandmarkProvider {
    fn detect(&self, _frame: &Frame) -> Result<Option<FaceLandmarks>, EngineError> {
        Ok(None)
    }
}

/// Axis-aligned face bounding box in normalized coordinates.
#[derive(Debug, Clone, Copy)]
pub struct FaceBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl FaceBox {
    pub fn width(&self) -> f64 {
        (self.max_x - self.min_x).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.max_y - self.min_y).max(0.0)
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

pub fn face_box(landmarks: &FaceLandmarks) -> FaceBox {
    let mut min_x = f64::MAX;
    let mut min_y = f64::MAX;
    let mut max_x = f64::MIN;
    let mut max_y = f64::MIN;
    for p in &landmarks.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    FaceBox {
        min_x,
        min_y,
        max_x,
        max_y,
    }
}

/// Face bounding box area as a percentage of the frame area.
pub fn face_percentage(landmarks: &FaceLandmarks) -> f64 {
    let bbox = face_box(landmarks);
    bbox.width() * bbox.height() * 100.0
}

/// Head tilt in degrees: the angle of the line through the outer eye
/// corners against the horizontal.
pub fn tilt_degrees(landmarks: &FaceLandmarks) -> f64 {
    let left = landmarks.point(mesh::LEFT_EYE_OUTER);
    let right = landmarks.point(mesh::RIGHT_EYE_OUTER);
    let dy = right.y - left.y;
    let dx = right.x - left.x;
    dy.atan2(dx).to_degrees().abs()
}

/// Face-center offset from the frame center, as a percentage of the frame
/// diagonal half-extent.
pub fn center_offset_percentage(landmarks: &FaceLandmarks) -> f64 {
    let (cx, cy) = face_box(landmarks).center();
    let dx = cx - 0.5;
    let dy = cy - 0.5;
    (dx * dx + dy * dy).sqrt() * 100.0
}

fn distance(a: Landmark, b: Landmark) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

fn eye_aspect_ratio(landmarks: &FaceLandmarks, ring: &[usize; 6]) -> f64 {
    let p: Vec<Landmark> = ring.iter().map(|&i| landmarks.point(i)).collect();
    let horizontal = distance(p[0], p[3]);
    if horizontal == 0.0 {
        return 0.0;
    }
    let vertical = distance(p[1], p[5]) + distance(p[2], p[4]);
    vertical / (2.0 * horizontal)
}

/// True when both eyes pass the aspect-ratio openness test.
pub fn eyes_open(landmarks: &FaceLandmarks) -> bool {
    let left = eye_aspect_ratio(landmarks, &mesh::LEFT_EYE_RING);
    let right = eye_aspect_ratio(landmarks, &mesh::RIGHT_EYE_RING);
    (left + right) / 2.0 >= EYE_OPEN_RATIO
}

/// True when the nose tip sits on the face midline, the proxy for a
/// camera-facing gaze.
pub fn gaze_aligned(landmarks: &FaceLandmarks) -> bool {
    let nose = landmarks.point(mesh::NOSE_TIP);
    let left = landmarks.point(mesh::FACE_LEFT_EDGE);
    let right = landmarks.point(mesh::FACE_RIGHT_EDGE);
    let face_width = (right.x - left.x).abs();
    if face_width == 0.0 {
        return false;
    }
    let midline = (left.x + right.x) / 2.0;
    ((nose.x - midline) / face_width).abs() < GAZE_OFFSET_LIMIT
}

/// True when the lip gap stays under the pixel limit at the frame's scale.
pub fn mouth_closed(landmarks: &FaceLandmarks, frame_height: u32) -> bool {
    let upper = landmarks.point(mesh::UPPER_LIP);
    let lower = landmarks.point(mesh::LOWER_LIP);
    (lower.y - upper.y).abs() * frame_height as f64 <= MOUTH_GAP_PX
}

/// Glasses heuristic: edge density in the band spanning both eyes. Frames
/// and lenses add strong edges that bare skin does not.
pub fn glasses_detected(gray: &GrayImage, landmarks: &FaceLandmarks) -> bool {
    let left = landmarks.point(mesh::LEFT_EYE_OUTER);
    let right = landmarks.point(mesh::RIGHT_EYE_OUTER);
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return false;
    }

    let eye_y = ((left.y + right.y) / 2.0 * height as f64) as i64;
    let band_half = (height as f64 * 0.05).max(4.0) as i64;
    let x0 = ((left.x.min(right.x) * width as f64) as i64 - band_half).max(0) as u32;
    let x1 = (((left.x.max(right.x) * width as f64) as i64 + band_half) as u32).min(width - 1);
    let y0 = (eye_y - band_half).max(0) as u32;
    let y1 = ((eye_y + band_half) as u32).min(height - 1);
    if x1 <= x0 || y1 <= y0 {
        return false;
    }

    let band = image::imageops::crop_imm(gray, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image();
    if band.width() < 3 || band.height() < 3 {
        return false;
    }
    let edges = canny(&band, 50.0, 150.0);
    let edge_count = edges.pixels().filter(|p| p.0[0] > 0).count();
    edge_count > GLASSES_EDGE_COUNT
}

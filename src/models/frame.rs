use image::{DynamicImage, GrayImage, RgbImage};

use crate::utils::EngineError;

/// A decoded raster frame, as handed over by the acquisition layer.
///
/// The frame is immutable once constructed: the grayscale projection is
/// computed eagerly so every extractor shares the same read-only buffers and
/// can run concurrently without touching the pixels again.
pub struct Frame {
    rgb: RgbImage,
    gray: GrayImage,
}

impl Frame {
    pub fn from_image(image: DynamicImage) -> Frame {
        let gray = image.to_luma8();
        let rgb = image.to_rgb8();
        Frame { rgb, gray }
    }

    /// Decode a frame from raw encoded bytes (PNG, JPEG, ...).
    pub fn from_bytes(data: &[u8]) -> Result<Frame, EngineError> {
        let image = image::load_from_memory(data)
            .map_err(|e| EngineError::ImageProcessing(format!("failed to decode image: {}", e)))?;
        Ok(Frame::from_image(image))
    }

    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

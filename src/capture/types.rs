// Core capture types and traits
use crate::error::{TesterError, TesterResult};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;

#[derive(Debug, Clone)]
pub struct ImageCapture {
    pub image: RgbImage,
    pub duration_ms: u128,
    pub index: u64, // sequential capture count, managed by the caller
}

// Trait implemented by every desktop capture source (xcap, test fakes)
pub trait ScreenCapture {
    // Raw capture as encoded image bytes (PNG)
    fn capture_bytes(&mut self) -> TesterResult<Vec<u8>>;

    // Decoded raster; sources that already hold pixels skip the encode/decode
    fn capture_frame(&mut self) -> TesterResult<RgbImage> {
        decode_capture(&self.capture_bytes()?)
    }

    // Default high-level capture with timing
    fn capture(&mut self) -> TesterResult<ImageCapture> {
        let start = std::time::Instant::now();
        let image = self.capture_frame()?;
        let dur = start.elapsed().as_millis();
        Ok(ImageCapture {
            image,
            duration_ms: dur,
            index: 0,
        })
    }

    fn name(&self) -> &str;
}

/// Decode captured bytes into an RGB raster.
///
/// A failure here is transient for the poller, so it maps to `CaptureFailed`
/// rather than `DecodeError` (which is reserved for reference images).
pub fn decode_capture(bytes: &[u8]) -> TesterResult<RgbImage> {
    let image = image::load_from_memory(bytes).map_err(|e| TesterError::CaptureFailed {
        description: format!("could not decode screenshot ({} bytes): {e}", bytes.len()),
    })?;
    Ok(image.to_rgb8())
}

/// Encode an RGB raster as PNG bytes
pub fn encode_png(image: &RgbImage) -> TesterResult<Vec<u8>> {
    let mut out = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| TesterError::CaptureFailed {
            description: format!("PNG encoding failed: {e}"),
        })?;
    Ok(out)
}

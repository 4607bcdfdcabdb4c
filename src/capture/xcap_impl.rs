// Desktop capture through xcap (primary monitor)
use super::types::{ScreenCapture, encode_png};
use crate::error::{TesterError, TesterResult};
use image::RgbImage;
use xcap::Monitor;

pub struct XcapCapture {
    name: String,
}

impl XcapCapture {
    /// Probe the monitors once so a missing display fails at startup, not mid-test.
    pub fn new() -> TesterResult<Self> {
        let monitor = Self::primary_monitor()?;
        let name = monitor.name().unwrap_or_else(|_| "unknown".to_string());
        log::debug!("🖥️ Capturing desktop from monitor '{}'", name);
        Ok(Self { name })
    }

    fn primary_monitor() -> TesterResult<Monitor> {
        let monitors = Monitor::all().map_err(|e| TesterError::CaptureFailed {
            description: format!("failed to enumerate monitors: {e}"),
        })?;

        let mut fallback = None;
        for monitor in monitors {
            if monitor.is_primary().unwrap_or(false) {
                return Ok(monitor);
            }
            if fallback.is_none() {
                fallback = Some(monitor);
            }
        }
        fallback.ok_or_else(|| TesterError::CaptureFailed {
            description: "no monitors found".to_string(),
        })
    }

    /// Scale factor the OS reports for the primary monitor.
    ///
    /// This is a starting point for `capture_to_input_scale`; confirm it by
    /// clicking a known target on the machine under test.
    pub fn primary_scale_factor() -> TesterResult<f64> {
        let monitor = Self::primary_monitor()?;
        let factor = monitor
            .scale_factor()
            .map_err(|e| TesterError::CaptureFailed {
                description: format!("failed to read monitor scale factor: {e}"),
            })?;
        Ok(factor as f64)
    }
}

impl ScreenCapture for XcapCapture {
    fn capture_bytes(&mut self) -> TesterResult<Vec<u8>> {
        encode_png(&self.capture_frame()?)
    }

    fn capture_frame(&mut self) -> TesterResult<RgbImage> {
        let monitor = Self::primary_monitor()?;
        let raw = monitor
            .capture_image()
            .map_err(|e| TesterError::CaptureFailed {
                description: format!("monitor capture failed: {e}"),
            })?;

        // Rebuild through our own image version; xcap may link a different one.
        let (width, height) = (raw.width(), raw.height());
        let rgba = image::RgbaImage::from_raw(width, height, raw.into_raw()).ok_or_else(|| {
            TesterError::CaptureFailed {
                description: format!("capture buffer does not match {width}x{height}"),
            }
        })?;
        Ok(image::DynamicImage::ImageRgba8(rgba).to_rgb8())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

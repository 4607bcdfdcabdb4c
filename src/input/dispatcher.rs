//! Click dispatch: match geometry to a pointer click

use super::PointerInput;
use crate::error::{TesterError, TesterResult};
use crate::template_matching::MatchResult;

/// Pointer-space point for a match at `(x, y)` of size `width`x`height`.
///
/// The centroid is taken with integer floor division in capture pixels, then
/// divided by `scale` (capture pixels per pointer unit).
pub fn dispatch_point(x: u32, y: u32, width: u32, height: u32, scale: f64) -> (f64, f64) {
    let center_x = x + width / 2;
    let center_y = y + height / 2;
    (center_x as f64 / scale, center_y as f64 / scale)
}

/// Clicks the centre of matched regions
pub struct ClickDispatcher {
    pointer: Box<dyn PointerInput>,
    scale: f64,
}

impl ClickDispatcher {
    pub fn new(pointer: Box<dyn PointerInput>, scale: f64) -> TesterResult<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(TesterError::invalid_config(format!(
                "capture_to_input_scale must be a positive number, got {scale}"
            )));
        }
        Ok(Self { pointer, scale })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Click the centre of the region. No check is made that the click hit anything.
    pub fn click_on_match(&mut self, x: u32, y: u32, width: u32, height: u32) -> TesterResult<()> {
        let (px, py) = dispatch_point(x, y, width, height, self.scale);
        log::info!(
            "🖱️ Clicking on {}, {} (pointer {:.1}, {:.1} at scale {})",
            x + width / 2,
            y + height / 2,
            px,
            py,
            self.scale
        );
        self.pointer.click_at(px, py)
    }

    pub fn click_match(&mut self, found: &MatchResult) -> TesterResult<()> {
        self.click_on_match(found.x, found.y, found.width, found.height)
    }
}

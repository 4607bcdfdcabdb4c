/// Polling matcher: capture, score, annotate, repeat until found or timed out
use super::matcher::{TemplateMatcher, WindowScore};
use super::reference::ReferenceImage;
use super::types::{BestSeen, MatchPolicy, MatchResult, PollOutcome};
use crate::capture::ScreenCapture;
use crate::config::TesterConfig;
use crate::diagnostics::{
    DiagnosticsSink, annotate_attempt, annotate_reference, png_file_name, unix_timestamp,
};
use crate::error::{TesterError, TesterResult};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const DEBUG_TEMPLATE_NAME: &str = "debug_template.png";

/// Repeatedly screenshots the desktop looking for a reference image
pub struct MatchPoller {
    capture: Box<dyn ScreenCapture>,
    sink: Box<dyn DiagnosticsSink>,
    matcher: TemplateMatcher,
    policy: MatchPolicy,
    poll_interval: Duration,
    backoff_interval: Duration,
    capture_count: u64,
}

impl MatchPoller {
    pub fn new(
        config: &TesterConfig,
        capture: Box<dyn ScreenCapture>,
        sink: Box<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            capture,
            sink,
            matcher: TemplateMatcher::new(config.score_method),
            policy: config.match_policy,
            poll_interval: config.poll_interval,
            backoff_interval: config.backoff_interval,
            capture_count: 0,
        }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: MatchPolicy) {
        self.policy = policy;
    }

    /// Captures attempted so far by this poller, failed ones included
    pub fn capture_count(&self) -> u64 {
        self.capture_count
    }

    /// Wait for `reference_path` to appear on screen.
    ///
    /// Returns `Ok(None)` when nothing cleared `threshold` before `timeout`.
    /// Errors only for setup defects: a missing or undecodable reference, or a
    /// capture source that never produced a single usable screenshot.
    pub fn wait_for_match(
        &mut self,
        reference_path: &Path,
        timeout: Duration,
        threshold: f32,
    ) -> TesterResult<Option<MatchResult>> {
        Ok(self.poll(reference_path, timeout, threshold)?.into_match())
    }

    /// Like [`wait_for_match`](Self::wait_for_match) but keeps the best score
    /// seen when nothing matched
    pub fn poll(
        &mut self,
        reference_path: &Path,
        timeout: Duration,
        threshold: f32,
    ) -> TesterResult<PollOutcome> {
        let reference = ReferenceImage::load(reference_path)?;
        log::info!(
            "🖼️ Reference {} is {}x{}",
            reference.name,
            reference.width,
            reference.height
        );
        self.poll_reference(&reference, timeout, threshold)
    }

    /// Poll for an already loaded reference
    pub fn poll_reference(
        &mut self,
        reference: &ReferenceImage,
        timeout: Duration,
        threshold: f32,
    ) -> TesterResult<PollOutcome> {
        if let Err(e) = self
            .sink
            .persist(DEBUG_TEMPLATE_NAME, &annotate_reference(&reference.rgb))
        {
            log::warn!("⚠️ Could not save {}: {}", DEBUG_TEMPLATE_NAME, e);
        }

        let start = Instant::now();
        let mut best_seen: Option<BestSeen> = None;
        let mut best_qualifying: Option<MatchResult> = None;
        let mut attempts = 0u32;
        let mut captures = 0u32;
        let mut last_error: Option<String> = None;

        loop {
            attempts += 1;

            let pause = match self.grab() {
                Err(e) if e.is_transient() => {
                    log::warn!("⚠️ Attempt {}: could not load screenshot: {}", attempts, e);
                    last_error = Some(e.to_string());
                    self.backoff_interval
                }
                Err(e) => return Err(e),
                Ok(capture) => {
                    captures += 1;
                    match self.matcher.find_best(&capture, &reference.rgb) {
                        None => log::warn!(
                            "⚠️ Attempt {}: reference {}x{} does not fit in {}x{} capture",
                            attempts,
                            reference.width,
                            reference.height,
                            capture.width(),
                            capture.height()
                        ),
                        Some(window) => {
                            log::info!(
                                "🔍 Attempt {}: best match {:.4} at ({},{}) (threshold: {:.4})",
                                attempts,
                                window.score,
                                window.x,
                                window.y,
                                threshold
                            );

                            if best_seen.is_none_or(|b| window.score > b.score) {
                                best_seen = Some(BestSeen {
                                    x: window.x,
                                    y: window.y,
                                    score: window.score,
                                    attempt: attempts,
                                });
                            }

                            self.persist_attempt(&capture, &window, reference, threshold);

                            if window.score >= threshold {
                                let found = MatchResult {
                                    x: window.x,
                                    y: window.y,
                                    width: reference.width,
                                    height: reference.height,
                                    score: window.score,
                                };
                                match self.policy {
                                    MatchPolicy::FirstQualifying => {
                                        log::info!(
                                            "✅ Match found at {:?} with confidence {:.4}",
                                            found.coords(),
                                            found.score
                                        );
                                        return Ok(PollOutcome::Found(found));
                                    }
                                    MatchPolicy::BestQualifying => {
                                        if best_qualifying.is_none_or(|b| found.score > b.score) {
                                            best_qualifying = Some(found);
                                        }
                                    }
                                }
                            }
                        }
                    }
                    self.poll_interval
                }
            };

            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            std::thread::sleep(pause.min(remaining));
            if start.elapsed() >= timeout {
                break;
            }
        }

        if let Some(found) = best_qualifying {
            log::info!(
                "✅ Best match at {:?} with confidence {:.4}",
                found.coords(),
                found.score
            );
            return Ok(PollOutcome::Found(found));
        }

        if captures == 0 {
            return Err(TesterError::CaptureUnavailable {
                attempts,
                last_error: last_error.unwrap_or_else(|| "no capture attempted".to_string()),
            });
        }

        match best_seen {
            Some(best) => log::info!(
                "❌ No match for {} within {:?}; best was {:.4} at ({},{}) on attempt {}",
                reference.name,
                timeout,
                best.score,
                best.x,
                best.y,
                best.attempt
            ),
            None => log::info!("❌ No match for {} within {:?}", reference.name, timeout),
        }

        Ok(PollOutcome::NotFound {
            best_seen,
            attempts,
            captures,
        })
    }

    /// Save a desktop screenshot through the diagnostics sink.
    ///
    /// Without a name, `desktop_screenshot_<unixtime>.png` is used; `.png` is
    /// appended to names lacking it.
    pub fn take_desktop_screenshot(&mut self, filename: Option<&str>) -> TesterResult<PathBuf> {
        let name = match filename {
            Some(name) => png_file_name(name),
            None => format!("desktop_screenshot_{}.png", unix_timestamp()),
        };
        let capture = self.grab()?;
        self.sink.persist(&name, &capture)
    }

    fn grab(&mut self) -> TesterResult<RgbImage> {
        self.capture_count += 1;
        let mut cap = self.capture.capture()?;
        cap.index = self.capture_count;
        log::debug!(
            "📸 Capture #{} from {}: {}x{} in {}ms",
            cap.index,
            self.capture.name(),
            cap.image.width(),
            cap.image.height(),
            cap.duration_ms
        );
        Ok(cap.image)
    }

    fn persist_attempt(
        &mut self,
        capture: &RgbImage,
        window: &WindowScore,
        reference: &ReferenceImage,
        threshold: f32,
    ) {
        let debug_image = annotate_attempt(
            capture,
            window.x,
            window.y,
            reference.width,
            reference.height,
            window.score,
            threshold,
        );
        let name = format!("debug_match_{}.png", unix_timestamp());
        if let Err(e) = self.sink.persist(&name, &debug_image) {
            log::warn!("⚠️ Could not save {}: {}", name, e);
        }
    }
}

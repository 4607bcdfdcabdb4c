//! Configuration for the screen tester
//!
//! Everything the harness would otherwise default deep inside constructors is
//! listed here and passed explicitly.

use crate::browser::BrowserKind;
use crate::error::{TesterError, TesterResult};
use crate::template_matching::{MatchPolicy, ScoreMethod};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

#[derive(Debug, Clone)]
pub struct TesterConfig {
    /// Browser driven through WebDriver
    pub browser: BrowserKind,
    /// Launch the browser without a visible window
    pub headless: bool,
    /// Directory holding desktop screenshots and debug artifacts
    pub screenshots_dir: PathBuf,
    /// Delay between two capture-and-score attempts
    pub poll_interval: Duration,
    /// Delay after a capture that could not be taken or decoded
    pub backoff_interval: Duration,
    /// Threshold used when a caller does not pass one
    pub default_threshold: f32,
    /// Timeout used when a caller does not pass one
    pub default_timeout: Duration,
    /// Similarity metric used to score each window
    pub score_method: ScoreMethod,
    /// Which qualifying capture wins
    pub match_policy: MatchPolicy,
    /// Capture pixels per pointer-input unit.
    ///
    /// A match centroid is divided by this value before the click is
    /// dispatched. 1.0 when screenshots and pointer share one coordinate
    /// space, typically 2.0 on a double-density display. Measure it on the
    /// target machine; never assume it.
    pub capture_to_input_scale: f64,
    /// WebDriver endpoint tried first
    pub webdriver_url: String,
    /// Driver binary started locally when the endpoint is unreachable
    pub driver_command: String,
    /// Wait after the browser session is created
    pub startup_settle: Duration,
    /// Wait after each navigation
    pub navigation_settle: Duration,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chrome,
            headless: false,
            screenshots_dir: PathBuf::from("screenshots"),
            poll_interval: Duration::from_millis(500),
            backoff_interval: Duration::from_millis(500),
            default_threshold: 0.8,
            default_timeout: Duration::from_secs(10),
            score_method: ScoreMethod::CorrelationCoefficientNormalized,
            match_policy: MatchPolicy::FirstQualifying,
            capture_to_input_scale: 1.0,
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            driver_command: BrowserKind::Chrome.driver_command().to_string(),
            startup_settle: Duration::from_secs(1),
            navigation_settle: Duration::from_secs(1),
        }
    }
}

impl TesterConfig {
    /// Reject values that would make polling or clicking meaningless.
    ///
    /// The threshold is deliberately not checked: out-of-range values are a
    /// tuning tool, they just make a match impossible or certain.
    pub fn validate(&self) -> TesterResult<()> {
        if !(self.capture_to_input_scale.is_finite() && self.capture_to_input_scale > 0.0) {
            return Err(TesterError::invalid_config(format!(
                "capture_to_input_scale must be a positive number, got {}",
                self.capture_to_input_scale
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(TesterError::invalid_config("poll_interval must be non-zero"));
        }
        if self.backoff_interval.is_zero() {
            return Err(TesterError::invalid_config(
                "backoff_interval must be non-zero",
            ));
        }
        if self.screenshots_dir.as_os_str().is_empty() {
            return Err(TesterError::invalid_config("screenshots_dir is empty"));
        }
        Ok(())
    }

    /// Switch browser and the matching default driver binary together.
    pub fn with_browser(mut self, browser: BrowserKind) -> Self {
        self.browser = browser;
        self.driver_command = browser.driver_command().to_string();
        self
    }
}

/// Preset for double-density displays where screenshots are 2x the pointer space
pub fn create_hidpi_config() -> TesterConfig {
    TesterConfig {
        capture_to_input_scale: 2.0,
        ..TesterConfig::default()
    }
}

/// Preset for unattended runs: headless browser and tighter polling
pub fn create_ci_config() -> TesterConfig {
    TesterConfig {
        headless: true,
        poll_interval: Duration::from_millis(250),
        startup_settle: Duration::from_millis(500),
        ..TesterConfig::default()
    }
}

//! Screen tester facade: browser, desktop capture, matching and clicks in one place

use crate::browser::{Browser, WebDriverBrowser};
use crate::capture::{ScreenCapture, XcapCapture};
use crate::config::TesterConfig;
use crate::diagnostics::{DiagnosticsSink, FileSink};
use crate::error::{TesterError, TesterResult};
use crate::input::{ClickDispatcher, PointerInput, RdevPointer};
use crate::template_matching::{MatchPoller, MatchResult, PollOutcome};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct ScreenTester {
    config: TesterConfig,
    browser: Option<Box<dyn Browser>>,
    poller: MatchPoller,
    clicker: ClickDispatcher,
}

impl ScreenTester {
    /// Start a real session: screenshots directory, WebDriver browser,
    /// primary-monitor capture and OS pointer.
    pub fn launch(config: TesterConfig) -> TesterResult<Self> {
        config.validate()?;
        let sink = FileSink::new(&config.screenshots_dir)?;
        let browser = WebDriverBrowser::connect(&config)?;
        let capture = XcapCapture::new()?;
        let pointer = RdevPointer::new();
        let settle = config.startup_settle;

        let tester = Self::from_parts(
            config,
            Box::new(browser),
            Box::new(capture),
            Box::new(pointer),
            Box::new(sink),
        )?;
        std::thread::sleep(settle);
        Ok(tester)
    }

    /// Assemble a tester from already built components
    pub fn from_parts(
        config: TesterConfig,
        browser: Box<dyn Browser>,
        capture: Box<dyn ScreenCapture>,
        pointer: Box<dyn PointerInput>,
        sink: Box<dyn DiagnosticsSink>,
    ) -> TesterResult<Self> {
        config.validate()?;
        let poller = MatchPoller::new(&config, capture, sink);
        let clicker = ClickDispatcher::new(pointer, config.capture_to_input_scale)?;
        Ok(Self {
            config,
            browser: Some(browser),
            poller,
            clicker,
        })
    }

    pub fn config(&self) -> &TesterConfig {
        &self.config
    }

    fn browser(&mut self) -> TesterResult<&mut Box<dyn Browser>> {
        self.browser
            .as_mut()
            .ok_or_else(|| TesterError::browser("session", "tester already closed"))
    }

    /// Navigate and give the page time to render
    pub fn go_to(&mut self, url: &str) -> TesterResult<()> {
        self.browser()?.navigate(url)?;
        std::thread::sleep(self.config.navigation_settle);
        Ok(())
    }

    pub fn current_url(&mut self) -> TesterResult<String> {
        self.browser()?.current_url()
    }

    pub fn take_desktop_screenshot(&mut self, filename: Option<&str>) -> TesterResult<PathBuf> {
        let path = self.poller.take_desktop_screenshot(filename)?;
        log::info!("📸 Desktop screenshot saved to {}", path.display());
        Ok(path)
    }

    /// Poll the desktop for `reference_path`.
    ///
    /// `None` for timeout or threshold falls back to the configured defaults.
    /// A reference that never shows up is `Ok(None)`, not an error.
    pub fn wait_for_match(
        &mut self,
        reference_path: &Path,
        timeout: Option<Duration>,
        threshold: Option<f32>,
    ) -> TesterResult<Option<MatchResult>> {
        Ok(self.poll(reference_path, timeout, threshold)?.into_match())
    }

    /// Same as [`wait_for_match`](Self::wait_for_match), keeping the best
    /// score seen on a miss
    pub fn poll(
        &mut self,
        reference_path: &Path,
        timeout: Option<Duration>,
        threshold: Option<f32>,
    ) -> TesterResult<PollOutcome> {
        let timeout = timeout.unwrap_or(self.config.default_timeout);
        let threshold = threshold.unwrap_or(self.config.default_threshold);
        log::info!(
            "⏳ Waiting up to {:?} for {} (threshold: {})",
            timeout,
            reference_path.display(),
            threshold
        );
        self.poller.poll(reference_path, timeout, threshold)
    }

    pub fn click_on_match(&mut self, x: u32, y: u32, width: u32, height: u32) -> TesterResult<()> {
        self.clicker.click_on_match(x, y, width, height)
    }

    pub fn click_match(&mut self, found: &MatchResult) -> TesterResult<()> {
        self.clicker.click_match(found)
    }

    /// Fail with [`TesterError::MatchAssertion`] when the reference is not
    /// found; a `failure_<reference file name>` screenshot is saved first.
    pub fn assert_match(
        &mut self,
        reference_path: &Path,
        timeout: Option<Duration>,
        threshold: Option<f32>,
        message: Option<&str>,
    ) -> TesterResult<MatchResult> {
        let timeout = timeout.unwrap_or(self.config.default_timeout);
        if let Some(found) = self.wait_for_match(reference_path, Some(timeout), threshold)? {
            return Ok(found);
        }

        let reference_name = reference_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "reference".to_string());
        let screenshot = self.take_desktop_screenshot(Some(&format!("failure_{reference_name}")))?;
        let message = match message {
            Some(m) => m.to_string(),
            None => format!(
                "Element matching '{}' not found within {} seconds",
                reference_path.display(),
                timeout.as_secs_f64()
            ),
        };
        log::error!("❌ {}", message);
        Err(TesterError::MatchAssertion {
            message,
            screenshot,
        })
    }

    /// Close the browser session; calling it again does nothing
    pub fn close(&mut self) -> TesterResult<()> {
        match self.browser.take() {
            Some(mut browser) => {
                log::info!("🛑 Closing browser");
                browser.close()
            }
            None => Ok(()),
        }
    }
}

impl Drop for ScreenTester {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("⚠️ Close on drop failed: {}", e);
        }
    }
}

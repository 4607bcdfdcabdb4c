//! Click-through scenario: open a page, click a target, check the result

use crate::error::{TesterError, TesterResult};
use crate::template_matching::{BestSeen, MatchResult, PollOutcome};
use crate::tester::ScreenTester;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

pub const AFTER_CLICK_SCREENSHOT: &str = "after_click_actual.png";

#[derive(Debug, Clone)]
pub struct Scenario {
    pub url: String,
    /// Element to click
    pub target: PathBuf,
    /// Expected to be on screen after the click
    pub verification: PathBuf,
    pub target_timeout: Duration,
    pub target_threshold: f32,
    pub verify_timeout: Duration,
    pub verify_threshold: f32,
    pub page_settle: Duration,
    pub after_click_settle: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    TargetNotFound,
    VerificationFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub url: String,
    pub status: ScenarioStatus,
    pub target: Option<MatchResult>,
    /// Closest miss when the target was not found
    pub target_best_seen: Option<BestSeen>,
    pub click_error: Option<String>,
    pub after_click_screenshot: Option<PathBuf>,
    pub url_after_click: Option<String>,
    pub verification: Option<MatchResult>,
    pub verification_best_seen: Option<BestSeen>,
}

impl ScenarioReport {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            status: ScenarioStatus::TargetNotFound,
            target: None,
            target_best_seen: None,
            click_error: None,
            after_click_screenshot: None,
            url_after_click: None,
            verification: None,
            verification_best_seen: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }
}

fn split(outcome: PollOutcome) -> (Option<MatchResult>, Option<BestSeen>) {
    match outcome {
        PollOutcome::Found(m) => (Some(m), None),
        PollOutcome::NotFound { best_seen, .. } => (None, best_seen),
    }
}

impl Scenario {
    pub fn new(
        url: impl Into<String>,
        target: impl Into<PathBuf>,
        verification: impl Into<PathBuf>,
    ) -> Self {
        Self {
            url: url.into(),
            target: target.into(),
            verification: verification.into(),
            target_timeout: Duration::from_secs(10),
            target_threshold: 0.6,
            verify_timeout: Duration::from_secs(5),
            verify_threshold: 0.5,
            page_settle: Duration::from_secs(2),
            after_click_settle: Duration::from_secs(3),
        }
    }

    /// Run against an open tester. Setup defects are errors; a missing
    /// target or failed verification is reported in the returned status.
    pub fn run(&self, tester: &mut ScreenTester) -> TesterResult<ScenarioReport> {
        for path in [&self.target, &self.verification] {
            if !path.exists() {
                log::error!("❌ Reference image {} not found", path.display());
                return Err(TesterError::ResourceNotFound { path: path.clone() });
            }
        }
        log::info!(
            "Using reference images: {} and {}",
            self.target.display(),
            self.verification.display()
        );

        let mut report = ScenarioReport::new(&self.url);

        tester.go_to(&self.url)?;
        std::thread::sleep(self.page_settle);

        let outcome = tester.poll(
            &self.target,
            Some(self.target_timeout),
            Some(self.target_threshold),
        )?;
        let (target, best_seen) = split(outcome);
        report.target_best_seen = best_seen;
        let Some(target) = target else {
            log::warn!("❌ Could not find {} on the page", self.target.display());
            return Ok(report);
        };
        report.target = Some(target);
        let (cx, cy) = target.center();
        log::info!(
            "✅ Found target at ({}, {}), size {}x{}, center ({}, {})",
            target.x,
            target.y,
            target.width,
            target.height,
            cx,
            cy
        );

        match tester.click_match(&target) {
            Ok(()) => {
                log::info!("✅ Sent click to target");
                std::thread::sleep(self.after_click_settle);
            }
            Err(e) => {
                log::warn!("⚠️ Automated click failed: {}", e);
                report.click_error = Some(e.to_string());
            }
        }

        let screenshot = tester.take_desktop_screenshot(Some(AFTER_CLICK_SCREENSHOT))?;
        report.after_click_screenshot = Some(screenshot);
        let current = tester.current_url()?;
        log::info!("Current URL after click: {}", current);
        report.url_after_click = Some(current);

        let outcome = tester.poll(
            &self.verification,
            Some(self.verify_timeout),
            Some(self.verify_threshold),
        )?;
        let (verification, best_seen) = split(outcome);
        report.verification = verification;
        report.verification_best_seen = best_seen;
        report.status = if verification.is_some() {
            log::info!("✅ Verification successful");
            ScenarioStatus::Passed
        } else {
            log::warn!("❌ Verification failed: the click did not produce the expected change");
            ScenarioStatus::VerificationFailed
        };
        Ok(report)
    }

    /// Run, then close the tester. A failed close is logged and does not
    /// replace the report.
    pub fn run_and_close(&self, mut tester: ScreenTester) -> TesterResult<ScenarioReport> {
        let report = self.run(&mut tester);
        if let Err(e) = tester.close() {
            log::warn!("⚠️ Closing the browser failed: {}", e);
        }
        report
    }
}

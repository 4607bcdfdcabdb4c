//! Visual UI checks driven by screenshots.
//!
//! A [`tester::ScreenTester`] opens a page in a WebDriver browser, polls the
//! desktop for a reference image with normalized cross-correlation, clicks the
//! match and verifies the result with a second match.

pub mod args;
pub mod browser;
pub mod capture;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod input;
pub mod scenario;
pub mod template_matching;
pub mod tester;

#[cfg(test)]
mod test_support;

pub use error::{TesterError, TesterResult};
pub use scenario::{Scenario, ScenarioReport, ScenarioStatus};
pub use template_matching::{MatchResult, PollOutcome};
pub use tester::ScreenTester;

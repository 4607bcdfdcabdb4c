// Browser module - navigation through WebDriver
// Only what the harness needs: go to a URL, read it back, close the session.

pub mod webdriver;

pub use webdriver::WebDriverBrowser;

use crate::error::{TesterError, TesterResult};

/// Supported browser types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Chrome,
    Firefox,
}

impl std::str::FromStr for BrowserKind {
    type Err = TesterError;

    /// Parse browser type from string (case-insensitive)
    fn from_str(s: &str) -> TesterResult<Self> {
        match s.to_lowercase().as_str() {
            "chrome" | "chromium" => Ok(BrowserKind::Chrome),
            "firefox" => Ok(BrowserKind::Firefox),
            other => Err(TesterError::invalid_config(format!(
                "Browser '{other}' is not supported"
            ))),
        }
    }
}

impl BrowserKind {
    /// Driver binary started when no WebDriver endpoint is reachable
    pub fn driver_command(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chromedriver",
            BrowserKind::Firefox => "geckodriver",
        }
    }
}

// Trait for browser sessions (WebDriver, test fakes)
pub trait Browser {
    fn navigate(&mut self, url: &str) -> TesterResult<()>;
    fn current_url(&mut self) -> TesterResult<String>;
    /// Release the session. Must be safe to call more than once.
    fn close(&mut self) -> TesterResult<()>;
}

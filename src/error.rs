use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for screen tester operations.
pub type TesterResult<T> = Result<T, TesterError>;

/// The error type for all screen tester operations.
///
/// A missed match is not an error: the poller reports it as
/// [`PollOutcome::NotFound`](crate::template_matching::PollOutcome). Only the
/// assertion wrapper turns it into [`TesterError::MatchAssertion`].
#[derive(Debug, Error)]
pub enum TesterError {
    #[error("Reference image not found: {path:?}")]
    ResourceNotFound { path: PathBuf },

    #[error("Could not decode image {path:?}: {description}")]
    DecodeError { path: PathBuf, description: String },

    #[error("Screen capture failed: {description}")]
    CaptureFailed { description: String },

    #[error("No screen capture could be decoded in {attempts} attempts; last error: {last_error}")]
    CaptureUnavailable { attempts: u32, last_error: String },

    #[error("Failed to write artifact {path:?}: {description}")]
    ArtifactWrite { path: PathBuf, description: String },

    #[error("{message} (Failure screenshot saved to {})", screenshot.display())]
    MatchAssertion { message: String, screenshot: PathBuf },

    #[error("Pointer input failed: {description}")]
    PointerFailed { description: String },

    #[error("Failed to initialize browser driver: {fallback}. Original error: {primary}")]
    BrowserInit { primary: String, fallback: String },

    #[error("Browser command '{command}' failed: {description}")]
    Browser { command: String, description: String },

    #[error("Invalid configuration: {description}")]
    InvalidConfig { description: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl TesterError {
    /// Capture errors are retried by the poller; everything else is fatal to the call.
    pub fn is_transient(&self) -> bool {
        matches!(self, TesterError::CaptureFailed { .. })
    }

    pub(crate) fn browser(command: &str, err: impl std::fmt::Display) -> Self {
        TesterError::Browser {
            command: command.to_string(),
            description: err.to_string(),
        }
    }

    pub(crate) fn invalid_config(description: impl Into<String>) -> Self {
        TesterError::InvalidConfig {
            description: description.into(),
        }
    }
}

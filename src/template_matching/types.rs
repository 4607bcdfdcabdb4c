/// Template matching data types
use serde::Serialize;

/// Similarity metric used to score each reference-sized window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreMethod {
    /// Zero-mean normalized cross-correlation over R, G and B, range [-1, 1].
    /// Insensitive to uniform brightness shifts; flat windows score 0.
    CorrelationCoefficientNormalized,
    /// Colour normalized cross-correlation without mean removal, range [0, 1]
    CrossCorrelationNormalized,
}

/// Which qualifying capture a poll returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Return the first capture whose score clears the threshold
    FirstQualifying,
    /// Poll until the timeout and return the highest qualifying capture
    BestQualifying,
}

/// A located reference in one capture
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    /// Top-left X in capture pixels
    pub x: u32,
    /// Top-left Y in capture pixels
    pub y: u32,
    /// Always the reference width
    pub width: u32,
    /// Always the reference height
    pub height: u32,
    /// Similarity score of the capture that produced this match
    pub score: f32,
}

impl MatchResult {
    /// Centroid with integer floor division, in capture pixels
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// `(x, y, width, height)` tuple
    pub fn coords(&self) -> (u32, u32, u32, u32) {
        (self.x, self.y, self.width, self.height)
    }
}

/// Highest score seen across all attempts of one poll
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BestSeen {
    pub x: u32,
    pub y: u32,
    pub score: f32,
    /// 1-based attempt that produced it
    pub attempt: u32,
}

/// Result of a poll
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Found(MatchResult),
    NotFound {
        best_seen: Option<BestSeen>,
        /// Loop iterations, including failed captures
        attempts: u32,
        /// Captures that decoded and were scored
        captures: u32,
    },
}

impl PollOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, PollOutcome::Found(_))
    }

    pub fn into_match(self) -> Option<MatchResult> {
        match self {
            PollOutcome::Found(m) => Some(m),
            PollOutcome::NotFound { .. } => None,
        }
    }
}

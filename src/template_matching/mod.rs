/// Template matching module: locating reference images in desktop captures
///
/// - Colour zero-mean normalized cross-correlation scoring, with plain
///   normalized cross-correlation as an alternative
/// - Polling with per-attempt thresholding and best-seen tracking
/// - Annotated debug artifacts for every scored attempt
pub mod matcher;
pub mod poller;
pub mod reference;
pub mod types;

#[cfg(test)]
mod tests;

pub use matcher::{ScoreMap, TemplateMatcher, WindowScore};
pub use poller::{DEBUG_TEMPLATE_NAME, MatchPoller};
pub use reference::ReferenceImage;
pub use types::{BestSeen, MatchPolicy, MatchResult, PollOutcome, ScoreMethod};

//! Diagnostics: annotated debug images and the sinks that store them
//!
//! Artifact persistence is injected so the poller can be exercised without
//! touching disk.

pub mod annotate;
pub mod sink;

pub use annotate::{annotate_attempt, annotate_reference, draw_label};
pub use sink::{DiagnosticsSink, FileSink, MemorySink, png_file_name, unix_timestamp};

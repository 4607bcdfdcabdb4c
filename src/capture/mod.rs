// Capture module - full-desktop screenshots
// The poller takes decoded rasters; PNG bytes stay available on demand. The
// production adapter grabs the primary monitor through xcap.

pub mod types;
pub mod xcap_impl;

pub use types::{ImageCapture, ScreenCapture, decode_capture, encode_png};
pub use xcap_impl::XcapCapture;

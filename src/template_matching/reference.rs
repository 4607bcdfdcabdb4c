//! Reference image loading

use crate::error::{TesterError, TesterResult};
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Immutable reference raster, loaded fresh for every match call
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub path: PathBuf,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub rgb: RgbImage,
}

impl ReferenceImage {
    /// Load and decode a reference.
    ///
    /// Missing files give `ResourceNotFound`, undecodable or empty ones
    /// `DecodeError`. Neither is retried.
    pub fn load(path: &Path) -> TesterResult<Self> {
        if !path.exists() {
            return Err(TesterError::ResourceNotFound {
                path: path.to_path_buf(),
            });
        }

        let image = image::open(path).map_err(|e| TesterError::DecodeError {
            path: path.to_path_buf(),
            description: e.to_string(),
        })?;

        if image.width() == 0 || image.height() == 0 {
            return Err(TesterError::DecodeError {
                path: path.to_path_buf(),
                description: "image has zero width or height".to_string(),
            });
        }

        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("reference")
            .to_string();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            width: image.width(),
            height: image.height(),
            rgb: image.to_rgb8(),
        })
    }
}

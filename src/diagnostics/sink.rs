// Artifact sinks: where screenshots and debug visualizations end up
use crate::error::{TesterError, TesterResult};
use image::RgbImage;
use std::path::PathBuf;

/// Append `.png` unless the name already ends with it
pub fn png_file_name(name: &str) -> String {
    if name.ends_with(".png") {
        name.to_string()
    } else {
        format!("{name}.png")
    }
}

/// Seconds since the Unix epoch, used in artifact names
pub fn unix_timestamp() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

// Trait for artifact persistence (filesystem, memory, discard)
pub trait DiagnosticsSink {
    /// Store `image` under `name` (always a `.png` file name) and return where it went.
    fn persist(&mut self, name: &str, image: &RgbImage) -> TesterResult<PathBuf>;
}

/// Writes PNG files into the screenshots directory
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// Create the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> TesterResult<Self> {
        let dir = dir.into();
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            log::info!("📁 Created screenshots directory {}", dir.display());
        }
        Ok(Self { dir })
    }
}

impl DiagnosticsSink for FileSink {
    fn persist(&mut self, name: &str, image: &RgbImage) -> TesterResult<PathBuf> {
        let path = self.dir.join(png_file_name(name));
        image.save(&path).map_err(|e| TesterError::ArtifactWrite {
            path: path.clone(),
            description: e.to_string(),
        })?;
        log::debug!("💾 Saved {}", path.display());
        Ok(path)
    }
}

/// Keeps artifacts in memory so tests can inspect them without touching disk
#[derive(Default)]
pub struct MemorySink {
    root: PathBuf,
    artifacts: Vec<(String, RgbImage)>,
}

impl MemorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            artifacts: Vec::new(),
        }
    }

    pub fn artifacts(&self) -> &[(String, RgbImage)] {
        &self.artifacts
    }

    pub fn names(&self) -> Vec<&str> {
        self.artifacts.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Latest artifact stored under `name`
    pub fn get(&self, name: &str) -> Option<&RgbImage> {
        self.artifacts
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, img)| img)
    }
}

impl DiagnosticsSink for MemorySink {
    fn persist(&mut self, name: &str, image: &RgbImage) -> TesterResult<PathBuf> {
        let name = png_file_name(name);
        let path = self.root.join(&name);
        self.artifacts.push((name, image.clone()));
        Ok(path)
    }
}

// Shared sinks let a test keep a handle on what the tester stored.
impl<S: DiagnosticsSink> DiagnosticsSink for std::rc::Rc<std::cell::RefCell<S>> {
    fn persist(&mut self, name: &str, image: &RgbImage) -> TesterResult<PathBuf> {
        self.borrow_mut().persist(name, image)
    }
}

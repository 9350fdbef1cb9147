//! Per-run scratch directory
//!
//! Owned exclusively by one run and removed when dropped, whatever the
//! outcome of the run.

use std::path::PathBuf;
use tracing::{debug, warn};

pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Creates the directory (and any missing parents)
    pub fn create(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        std::fs::create_dir_all(&path)?;
        debug!("Created scratch directory {}", path.display());
        Ok(Self { path })
    }

    /// Writes a file inside the scratch directory and returns its path
    pub fn write(&self, name: &str, contents: &str) -> std::io::Result<PathBuf> {
        let file = self.path.join(name);
        std::fs::write(&file, contents)?;
        Ok(file)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed scratch directory {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove scratch directory {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

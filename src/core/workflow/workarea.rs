//! Working folders under `<base>/hdr`.

use crate::error::StageError;
use std::fs;
use std::path::{Path, PathBuf};

pub const HDR_DIR: &str = "hdr";
pub const TIFF_DIR: &str = "tiff";
pub const ALIGNED_DIR: &str = "aligned";

/// The output folder and the two intermediate folders shared by all
/// brackets of a run
#[derive(Debug, Clone)]
pub struct WorkArea {
    hdr: PathBuf,
    tiff: PathBuf,
    aligned: PathBuf,
    dry_run: bool,
}

impl WorkArea {
    pub fn new(base: &Path, dry_run: bool) -> Self {
        let hdr = base.join(HDR_DIR);
        Self {
            tiff: hdr.join(TIFF_DIR),
            aligned: hdr.join(ALIGNED_DIR),
            hdr,
            dry_run,
        }
    }

    /// Final HDR images land here
    pub fn hdr_dir(&self) -> &Path {
        &self.hdr
    }

    pub fn tiff_dir(&self) -> &Path {
        &self.tiff
    }

    pub fn aligned_dir(&self) -> &Path {
        &self.aligned
    }

    /// Create all three folders
    pub fn prepare(&self) -> Result<(), StageError> {
        for dir in [&self.hdr, &self.tiff, &self.aligned] {
            if self.dry_run {
                if !dir.is_dir() {
                    tracing::info!(path = %dir.display(), "Would create directory");
                }
                continue;
            }
            fs::create_dir_all(dir).map_err(|source| StageError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Remove the intermediate folders if nothing is left in them.
    ///
    /// Returns the folders that had to be kept.
    pub fn tidy(&self) -> Vec<PathBuf> {
        let mut kept = Vec::new();

        for dir in [&self.tiff, &self.aligned] {
            if !dir.is_dir() {
                continue;
            }
            if !is_empty_dir(dir) {
                tracing::warn!(path = %dir.display(), "Working folder is not empty, leaving it");
                kept.push(dir.clone());
                continue;
            }
            if self.dry_run {
                tracing::info!(path = %dir.display(), "Would remove empty directory");
                continue;
            }
            if let Err(e) = fs::remove_dir(dir) {
                tracing::warn!(path = %dir.display(), error = %e, "Could not remove working folder");
                kept.push(dir.clone());
            }
        }

        kept
    }
}

fn is_empty_dir(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

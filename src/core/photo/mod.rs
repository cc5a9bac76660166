//! # Photo Module
//!
//! A handle to an image file plus its metadata.
//!
//! Photos are never mutated. Conversion, alignment and fusion each
//! produce a new `Photo` pointing at a new path.

use crate::core::metadata::{MetadataReader, PhotoMetadata};
use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// An image file and its EXIF view. Identity is the file path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    path: PathBuf,
    metadata: PhotoMetadata,
}

impl Photo {
    /// Create a photo from a path and already-resolved metadata
    pub fn new(path: impl Into<PathBuf>, metadata: PhotoMetadata) -> Self {
        Self {
            path: path.into(),
            metadata,
        }
    }

    /// Create a photo by reading metadata through `reader`
    pub fn open(path: impl Into<PathBuf>, reader: &dyn MetadataReader) -> Self {
        let path = path.into();
        let metadata = reader.read(&path);
        Self { path, metadata }
    }

    /// A file derived from `source` (converted or aligned copy).
    ///
    /// The stage adapters copy EXIF tags onto derived files, so the
    /// in-memory view carries the source metadata over unchanged.
    pub fn derived(path: impl Into<PathBuf>, source: &Photo) -> Self {
        Self {
            path: path.into(),
            metadata: source.metadata.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &PhotoMetadata {
        &self.metadata
    }

    /// File name including extension
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without extension
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Lowercase extension without the dot, empty when absent
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    /// Trailing digits of the file stem as a number.
    ///
    /// `DSC01234.ARW` gives `1234`; a stem without digits gives `None`.
    pub fn sequence_number(&self) -> Option<u64> {
        static TRAILING_DIGITS: OnceLock<Regex> = OnceLock::new();
        let re = TRAILING_DIGITS.get_or_init(|| Regex::new(r"(\d+)$").expect("valid regex"));
        re.captures(&self.stem())
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    pub fn date(&self) -> Option<NaiveDateTime> {
        self.metadata.date_taken
    }

    pub fn camera(&self) -> Option<&str> {
        self.metadata.camera.as_deref()
    }

    pub fn lens(&self) -> Option<&str> {
        self.metadata.lens.as_deref()
    }

    pub fn iso(&self) -> Option<u32> {
        self.metadata.iso
    }

    pub fn shutter_speed(&self) -> Option<f64> {
        self.metadata.shutter_speed
    }

    pub fn exposure_bias(&self) -> Option<f64> {
        self.metadata.exposure_bias
    }

    pub fn exposure_value(&self) -> Option<f64> {
        self.metadata.exposure_value()
    }

    pub fn brightness(&self) -> Option<f64> {
        self.metadata.brightness
    }
}

impl PartialEq for Photo {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Photo {}

impl Hash for Photo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

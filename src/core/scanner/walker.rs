//! Directory listing implementation using walkdir.

use super::{filter::RawFilter, PhotoScanner, ScanResult};
use crate::core::metadata::{ExifMetadataReader, MetadataReader};
use crate::core::photo::Photo;
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent};
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

/// Configuration for the directory scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// RAW extension to collect (default `arw`)
    pub raw_extension: String,
    /// Whether to include hidden files
    pub include_hidden: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            raw_extension: "arw".to_string(),
            include_hidden: false,
        }
    }
}

/// Lists the top level of a directory in file-name order.
///
/// Camera file numbering makes name order a stand-in for capture order;
/// timestamps are not consulted to reorder files.
pub struct WalkDirScanner {
    filter: RawFilter,
    reader: Arc<dyn MetadataReader>,
}

impl WalkDirScanner {
    /// Create a scanner that reads EXIF metadata from disk
    pub fn new(config: ScanConfig) -> Self {
        Self::with_reader(config, Arc::new(ExifMetadataReader))
    }

    /// Create a scanner with a custom metadata reader
    pub fn with_reader(config: ScanConfig, reader: Arc<dyn MetadataReader>) -> Self {
        let filter = RawFilter::new(&config.raw_extension).with_hidden(config.include_hidden);
        Self { filter, reader }
    }
}

impl PhotoScanner for WalkDirScanner {
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        self.scan_with_events(root, &crate::events::null_sender())
    }

    fn scan_with_events(&self, root: &Path, events: &EventSender) -> Result<ScanResult, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        events.send(Event::Scan(ScanEvent::Started {
            path: root.to_path_buf(),
        }));

        let mut photos = Vec::new();
        let mut errors = Vec::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry_result in walker {
            match entry_result {
                Ok(entry) => {
                    if !entry.file_type().is_file() || !self.filter.should_include(entry.path()) {
                        continue;
                    }

                    events.send(Event::Scan(ScanEvent::PhotoFound {
                        path: entry.path().to_path_buf(),
                    }));
                    photos.push(Photo::open(entry.path(), self.reader.as_ref()));
                }
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    errors.push(ScanError::ReadDirectory {
                        path,
                        source: std::io::Error::other(e.to_string()),
                    });
                }
            }
        }

        tracing::debug!(count = photos.len(), dir = %root.display(), "Scan complete");
        events.send(Event::Scan(ScanEvent::Completed {
            total_photos: photos.len(),
        }));

        Ok(ScanResult { photos, errors })
    }
}

//! # Scanner Module
//!
//! Lists the RAW photos in a directory and resolves their metadata.
//!
//! Only the top level of the directory is read; the `hdr/` working
//! folders the workflow creates underneath are never rescanned.
//!
//! ## Example
//! ```rust,ignore
//! use photo_hdr::core::scanner::{PhotoScanner, ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::default());
//! let photos = scanner.scan(Path::new("/photos/2023-10-04"))?.photos;
//! ```

mod filter;
mod walker;

pub use filter::RawFilter;
pub use walker::{ScanConfig, WalkDirScanner};

use crate::core::photo::Photo;
use crate::error::ScanError;
use crate::events::EventSender;
use std::path::Path;

/// Result of a scan operation
#[derive(Debug)]
pub struct ScanResult {
    /// Photos in enumeration order
    pub photos: Vec<Photo>,
    /// Entries that could not be read (non-fatal)
    pub errors: Vec<ScanError>,
}

/// Trait for photo scanners
///
/// Implement this trait to create custom scanners (e.g., for testing).
pub trait PhotoScanner: Send + Sync {
    /// Scan a directory and return discovered photos
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError>;

    /// Scan with progress reporting via events
    fn scan_with_events(&self, root: &Path, events: &EventSender) -> Result<ScanResult, ScanError>;
}

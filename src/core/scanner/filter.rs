//! File filtering logic for the scanner.

use std::path::Path;

/// Accepts RAW files with a given extension
pub struct RawFilter {
    /// Lowercase extension without the dot
    extension: String,
    /// Whether to include hidden files
    include_hidden: bool,
}

impl RawFilter {
    /// Create a filter for one RAW extension (case-insensitive, dot optional)
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_lowercase(),
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Check if a file should be included
    pub fn should_include(&self, path: &Path) -> bool {
        if !self.include_hidden {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    return false;
                }
            }
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => ext.to_lowercase() == self.extension,
            None => false,
        }
    }
}

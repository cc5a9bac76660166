//! # Core Module
//!
//! The UI-agnostic HDR engine.
//!
//! ## Modules
//! - `photo` - A file plus its metadata view
//! - `metadata` - Reads EXIF values used for grouping and naming
//! - `scanner` - Lists the RAW photos of a directory
//! - `bracket` - Groups photos into exposure brackets
//! - `conflict` - Decides what happens when an output already exists
//! - `naming` - HDR file names and the intermediate naming convention
//! - `stages` - External tools: darktable, align_image_stack, enfuse, exiftool
//! - `workflow` - Orchestrates a full run

pub mod bracket;
pub mod conflict;
pub mod metadata;
pub mod naming;
pub mod photo;
pub mod scanner;
pub mod stages;
pub mod workflow;

// Re-export commonly used types
pub use bracket::{BracketDetector, Stack, StackCollection};
pub use conflict::{ConflictAction, ConflictPolicy};
pub use metadata::PhotoMetadata;
pub use photo::Photo;
pub use workflow::{BracketOutcome, HdrWorkflow, RunReport};

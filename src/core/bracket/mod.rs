//! Exposure bracket detection.
//!
//! Turns the photos of one directory into stacks of exposures meant to
//! be fused into a single HDR image.

mod detector;
mod types;

pub use detector::{BracketDetector, BreakReason};
pub use types::{Stack, StackCollection};

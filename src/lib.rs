//! # Photo HDR
//!
//! Finds exposure brackets in a folder of RAW photos and merges each one
//! into an HDR image with darktable, Hugin and enfuse.
//!
//! ## Core Philosophy
//! - **Never lose a photo** - only files the run created itself are ever deleted
//! - **One bad bracket is not a bad run** - failures are scoped and reported
//! - **Reproducible names** - the HDR file name depends only on the photos
//!
//! ## Architecture
//! The library is split into a core engine and presentation layers:
//! - `core` - Scanning, bracket detection, external tools, orchestration
//! - `events` - Event-driven progress reporting
//! - `error` - Typed errors with paths and tool names
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{HdrError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. `RUST_LOG`
/// takes precedence; otherwise `info`, or `debug` when `verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "photo_hdr=debug" } else { "photo_hdr=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

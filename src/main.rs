//! # photo-hdr CLI
//!
//! Merges the exposure brackets of a photo folder into HDR images.
//!
//! ## Usage
//! ```bash
//! photo-hdr ~/Pictures/2023-10-04 --onconflict rename
//! photo-hdr ~/Pictures/2023-10-04 --dry-run --verbose
//! ```

mod cli;

use std::process::ExitCode;

fn main() -> ExitCode {
    match cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", console::style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

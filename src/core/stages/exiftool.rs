//! Metadata propagation with exiftool.

use super::runner::CommandRunner;
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

/// Copies every EXIF tag from a source file onto a derived file.
///
/// exiftool keeps a `<dest>_original` backup; callers that own `dest`
/// own the backup too.
#[derive(Clone)]
pub struct ExifToolCopier {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl ExifToolCopier {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    /// Copy tags from `source` onto `dest`.
    ///
    /// Metadata is best-effort: failures are logged and never stop a bracket.
    pub fn copy(&self, source: &Path, dest: &Path) -> bool {
        let args: Vec<OsString> = vec![
            "-TagsFromFile".into(),
            source.into(),
            "-all".into(),
            dest.into(),
        ];

        match self.runner.execute(&self.program, &args) {
            Ok(output) if output.success() => true,
            Ok(output) => {
                tracing::warn!(
                    source = %source.display(),
                    dest = %dest.display(),
                    stderr = %output.stderr.trim(),
                    "Could not copy metadata"
                );
                false
            }
            Err(e) => {
                tracing::warn!(dest = %dest.display(), error = %e, "Could not run exiftool");
                false
            }
        }
    }
}

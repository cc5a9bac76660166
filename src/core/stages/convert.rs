//! RAW to TIFF conversion with darktable-cli.

use super::exiftool::ExifToolCopier;
use super::runner::CommandRunner;
use super::{ConvertStage, ToolConfig};
use crate::core::photo::Photo;
use crate::error::StageError;
use regex::Regex;
use std::ffi::OsString;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

/// darktable refuses to start while another instance holds its library
fn is_locked(output: &str) -> bool {
    static LOCKED: OnceLock<Regex> = OnceLock::new();
    LOCKED
        .get_or_init(|| Regex::new(r"(?i)the database lock file").expect("valid regex"))
        .is_match(output)
}

pub struct DarktableConverter {
    runner: Arc<dyn CommandRunner>,
    copier: ExifToolCopier,
    program: String,
    attempts: u32,
    retry_delay: Duration,
    dry_run: bool,
}

impl DarktableConverter {
    pub fn new(runner: Arc<dyn CommandRunner>, tools: &ToolConfig) -> Self {
        Self {
            copier: ExifToolCopier::new(runner.clone(), tools.exiftool.clone()),
            runner,
            program: tools.converter.clone(),
            attempts: tools.retry_attempts.max(1),
            retry_delay: tools.retry_delay,
            dry_run: false,
        }
    }

    /// Skip output existence checks; nothing is written in a dry run
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl ConvertStage for DarktableConverter {
    fn convert(&self, photo: &Photo, output: &Path) -> Result<Photo, StageError> {
        tracing::debug!(
            source = %photo.path().display(),
            output = %output.display(),
            "Converting to TIFF"
        );
        let args: Vec<OsString> = vec![photo.path().into(), output.into()];

        let mut attempt = 1;
        loop {
            let result = self.runner.execute(&self.program, &args)?;
            if result.success() {
                break;
            }

            let locked = is_locked(&result.stderr) || is_locked(&result.stdout);
            if locked && attempt < self.attempts {
                let wait = self.retry_delay * attempt;
                tracing::info!(
                    attempt,
                    wait_secs = wait.as_secs(),
                    "darktable library is locked, retrying"
                );
                thread::sleep(wait);
                attempt += 1;
                continue;
            }

            result.check(&self.program)?;
        }

        if !self.dry_run && !output.exists() {
            return Err(StageError::MissingOutput {
                stage: "convert",
                path: output.to_path_buf(),
            });
        }

        self.copier.copy(photo.path(), output);
        Ok(Photo::derived(output, photo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::PhotoMetadata;
    use crate::core::stages::testing::FakeRunner;
    use tempfile::TempDir;

    fn tools() -> ToolConfig {
        ToolConfig {
            retry_delay: Duration::ZERO,
            ..ToolConfig::default()
        }
    }

    fn raw(dir: &TempDir) -> Photo {
        let path = dir.path().join("DSC00042.ARW");
        std::fs::write(&path, b"raw").unwrap();
        Photo::new(
            path,
            PhotoMetadata {
                exposure_bias: Some(-1.0),
                ..Default::default()
            },
        )
    }

    #[test]
    fn convert_writes_tiff_and_copies_metadata() {
        let dir = TempDir::new().unwrap();
        let photo = raw(&dir);
        let output = dir.path().join("dsc00042.tif");
        let runner = Arc::new(FakeRunner::new());

        let converted = DarktableConverter::new(runner.clone(), &tools())
            .convert(&photo, &output)
            .unwrap();

        assert_eq!(converted.path(), output);
        assert_eq!(converted.exposure_bias(), Some(-1.0));
        assert!(output.exists());
        assert_eq!(runner.programs(), vec!["darktable-cli", "exiftool"]);
    }

    #[test]
    fn convert_retries_while_library_is_locked() {
        let dir = TempDir::new().unwrap();
        let photo = raw(&dir);
        let output = dir.path().join("dsc00042.tif");
        let runner = Arc::new(FakeRunner::new().locked("darktable-cli", 2));

        DarktableConverter::new(runner.clone(), &tools())
            .convert(&photo, &output)
            .unwrap();

        let conversions = runner
            .programs()
            .into_iter()
            .filter(|p| p == "darktable-cli")
            .count();
        assert_eq!(conversions, 3);
    }

    #[test]
    fn convert_gives_up_after_retry_budget() {
        let dir = TempDir::new().unwrap();
        let photo = raw(&dir);
        let output = dir.path().join("dsc00042.tif");
        let runner = Arc::new(FakeRunner::new().locked("darktable-cli", 5));

        let err = DarktableConverter::new(runner, &tools())
            .convert(&photo, &output)
            .unwrap_err();

        assert!(matches!(err, StageError::ToolFailed { .. }));
    }

    #[test]
    fn convert_reports_missing_output() {
        let dir = TempDir::new().unwrap();
        let photo = raw(&dir);
        let output = dir.path().join("dsc00042.tif");
        let runner = Arc::new(FakeRunner::new().silent("darktable-cli"));

        let err = DarktableConverter::new(runner, &tools())
            .convert(&photo, &output)
            .unwrap_err();

        assert!(matches!(err, StageError::MissingOutput { stage: "convert", .. }));
    }

    #[test]
    fn dry_run_skips_existence_check() {
        let dir = TempDir::new().unwrap();
        let photo = raw(&dir);
        let output = dir.path().join("dsc00042.tif");
        let runner = Arc::new(FakeRunner::new().silent("darktable-cli"));

        let converted = DarktableConverter::new(runner, &tools())
            .dry_run(true)
            .convert(&photo, &output)
            .unwrap();

        assert_eq!(converted.path(), output);
        assert!(!output.exists());
    }

    #[test]
    fn lock_message_is_case_insensitive() {
        assert!(is_locked("ERROR: The Database Lock File is held"));
        assert!(!is_locked("could not open file"));
    }
}

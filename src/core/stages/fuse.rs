//! Exposure fusion with enfuse.

use super::runner::CommandRunner;
use super::{FuseStage, ToolConfig};
use crate::core::photo::Photo;
use crate::error::StageError;
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

/// Fewest photos enfuse can blend
pub const MIN_FUSE_INPUTS: usize = 2;

pub struct EnfuseFuser {
    runner: Arc<dyn CommandRunner>,
    program: String,
    dry_run: bool,
}

impl EnfuseFuser {
    pub fn new(runner: Arc<dyn CommandRunner>, tools: &ToolConfig) -> Self {
        Self {
            runner,
            program: tools.fuser.clone(),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl FuseStage for EnfuseFuser {
    fn fuse(&self, photos: &[Photo], output: &Path) -> Result<Option<Photo>, StageError> {
        if photos.is_empty() {
            return Err(StageError::EmptyInput { stage: "fuse" });
        }
        if photos.len() < MIN_FUSE_INPUTS {
            return Err(StageError::NotEnoughInputs {
                stage: "fuse",
                found: photos.len(),
                required: MIN_FUSE_INPUTS,
            });
        }

        let mut args: Vec<OsString> = vec!["-o".into(), output.into(), "-v".into()];
        args.extend(photos.iter().map(|p| p.path().as_os_str().to_owned()));

        tracing::debug!(count = photos.len(), output = %output.display(), "Fusing HDR");
        let result = self.runner.execute(&self.program, &args)?;
        if !result.success() {
            tracing::error!(
                output = %output.display(),
                code = ?result.code,
                "Failed to create HDR image"
            );
            return Ok(None);
        }

        if !self.dry_run && !output.exists() {
            return Err(StageError::MissingOutput {
                stage: "fuse",
                path: output.to_path_buf(),
            });
        }

        Ok(Some(Photo::derived(output, &photos[0])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::PhotoMetadata;
    use crate::core::stages::testing::FakeRunner;
    use tempfile::TempDir;

    fn aligned(dir: &TempDir, count: usize) -> Vec<Photo> {
        (0..count)
            .map(|i| {
                let path = dir.path().join(format!("p{}_aligned.tif", i));
                std::fs::write(&path, b"tiff").unwrap();
                Photo::new(path, PhotoMetadata::default())
            })
            .collect()
    }

    #[test]
    fn fuse_writes_output() {
        let dir = TempDir::new().unwrap();
        let photos = aligned(&dir, 3);
        let output = dir.path().join("x_hdr.tif");
        let runner = Arc::new(FakeRunner::new());

        let hdr = EnfuseFuser::new(runner.clone(), &ToolConfig::default())
            .fuse(&photos, &output)
            .unwrap()
            .unwrap();

        assert_eq!(hdr.path(), output);
        assert!(output.exists());
        let (_, args) = runner.calls().remove(0);
        assert_eq!(args[0], "-o");
        assert_eq!(args[2], "-v");
        assert_eq!(args.len(), 6);
    }

    #[test]
    fn fuse_needs_two_photos() {
        let dir = TempDir::new().unwrap();
        let photos = aligned(&dir, 1);
        let runner = Arc::new(FakeRunner::new());

        let err = EnfuseFuser::new(runner.clone(), &ToolConfig::default())
            .fuse(&photos, &dir.path().join("x_hdr.tif"))
            .unwrap_err();

        assert!(matches!(
            err,
            StageError::NotEnoughInputs { stage: "fuse", found: 1, required: 2 }
        ));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn tool_failure_is_no_result() {
        let dir = TempDir::new().unwrap();
        let photos = aligned(&dir, 2);
        let runner = Arc::new(FakeRunner::new().failing("enfuse"));

        let hdr = EnfuseFuser::new(runner, &ToolConfig::default())
            .fuse(&photos, &dir.path().join("x_hdr.tif"))
            .unwrap();

        assert!(hdr.is_none());
    }

    #[test]
    fn missing_output_is_an_error() {
        let dir = TempDir::new().unwrap();
        let photos = aligned(&dir, 2);
        let runner = Arc::new(FakeRunner::new().silent("enfuse"));

        let err = EnfuseFuser::new(runner, &ToolConfig::default())
            .fuse(&photos, &dir.path().join("x_hdr.tif"))
            .unwrap_err();

        assert!(matches!(err, StageError::MissingOutput { stage: "fuse", .. }));
    }
}

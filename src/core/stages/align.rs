//! Alignment with Hugin's align_image_stack.

use super::exiftool::ExifToolCopier;
use super::runner::CommandRunner;
use super::{AlignPlan, AlignStage, ToolConfig};
use crate::core::photo::Photo;
use crate::error::StageError;
use std::ffi::OsString;
use std::fs;
use std::sync::Arc;

/// Control points per image pair
const CONTROL_POINTS: &str = "25";
/// Worker threads align_image_stack may use
const THREADS: &str = "3";

pub struct HuginAligner {
    runner: Arc<dyn CommandRunner>,
    copier: ExifToolCopier,
    program: String,
    dry_run: bool,
}

impl HuginAligner {
    pub fn new(runner: Arc<dyn CommandRunner>, tools: &ToolConfig) -> Self {
        Self {
            copier: ExifToolCopier::new(runner.clone(), tools.exiftool.clone()),
            runner,
            program: tools.aligner.clone(),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn args(&self, photos: &[Photo], plan: &AlignPlan) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-a".into(),
            plan.prefix.as_os_str().to_owned(),
            "-m".into(),
            "-v".into(),
            "-C".into(),
            "-c".into(),
            CONTROL_POINTS.into(),
            "-t".into(),
            THREADS.into(),
        ];
        args.extend(photos.iter().map(|p| p.path().as_os_str().to_owned()));
        args
    }
}

impl AlignStage for HuginAligner {
    fn align(&self, photos: &[Photo], plan: &AlignPlan) -> Result<Vec<Photo>, StageError> {
        if photos.is_empty() {
            return Err(StageError::EmptyInput { stage: "align" });
        }
        if photos.len() != plan.targets.len() {
            tracing::error!(
                photos = photos.len(),
                targets = plan.targets.len(),
                "Alignment plan does not match its inputs"
            );
            return Ok(Vec::new());
        }

        tracing::debug!(count = photos.len(), prefix = %plan.prefix.display(), "Aligning photos");
        let result = self.runner.execute(&self.program, &self.args(photos, plan))?;
        if !result.success() {
            tracing::error!(code = ?result.code, "Could not align images");
            return Ok(Vec::new());
        }

        let outputs = plan.tool_outputs();
        if !self.dry_run {
            if let Some(missing) = outputs.iter().find(|path| !path.exists()) {
                tracing::error!(
                    path = %missing.display(),
                    stderr = %result.stderr.trim(),
                    "Aligner did not produce every output"
                );
                return Ok(Vec::new());
            }
        }

        let mut aligned = Vec::with_capacity(photos.len());
        for ((photo, output), target) in photos.iter().zip(&outputs).zip(&plan.targets) {
            if self.dry_run {
                tracing::info!(from = %output.display(), to = %target.display(), "Would rename");
            } else {
                fs::rename(output, target).map_err(|source| StageError::Io {
                    path: target.clone(),
                    source,
                })?;
                self.copier.copy(photo.path(), target);
            }
            aligned.push(Photo::derived(target, photo));
        }

        Ok(aligned)
    }
}

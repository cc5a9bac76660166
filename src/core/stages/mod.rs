//! # Stages Module
//!
//! Adapters around the external programs that do the image work.
//!
//! | Stage   | Trait          | Default adapter      | Program             |
//! |---------|----------------|----------------------|---------------------|
//! | convert | [`ConvertStage`] | [`DarktableConverter`] | `darktable-cli`     |
//! | align   | [`AlignStage`]   | [`HuginAligner`]       | `align_image_stack` |
//! | fuse    | [`FuseStage`]    | [`EnfuseFuser`]        | `enfuse`            |
//!
//! All of them run their program through a [`CommandRunner`] and copy
//! EXIF tags onto what they produce with [`ExifToolCopier`].

mod align;
mod convert;
mod exiftool;
mod fuse;
mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use align::HuginAligner;
pub use convert::DarktableConverter;
pub use exiftool::ExifToolCopier;
pub use fuse::{EnfuseFuser, MIN_FUSE_INPUTS};
pub use runner::{CommandOutput, CommandRunner, DryRunRunner, SystemCommandRunner};

use crate::core::naming;
use crate::core::photo::Photo;
use crate::error::StageError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Program names and retry behaviour for the external tools
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolConfig {
    pub converter: String,
    pub aligner: String,
    pub fuser: String,
    pub exiftool: String,
    /// Conversion attempts when darktable reports its library is locked
    pub retry_attempts: u32,
    /// Base backoff between conversion attempts; attempt `n` waits `n` times this
    pub retry_delay: Duration,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            converter: "darktable-cli".to_string(),
            aligner: "align_image_stack".to_string(),
            fuser: "enfuse".to_string(),
            exiftool: "exiftool".to_string(),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Converts one RAW photo into a TIFF
pub trait ConvertStage: Send + Sync {
    /// Write `photo` as a TIFF at `output` and return the converted photo
    fn convert(&self, photo: &Photo, output: &Path) -> Result<Photo, StageError>;
}

/// Aligns a set of converted photos against each other
pub trait AlignStage: Send + Sync {
    /// Align `photos` and move the results to `plan.targets`.
    ///
    /// All or nothing: unless every input produced an output the result
    /// is empty. The caller owns every path named by `plan`.
    fn align(&self, photos: &[Photo], plan: &AlignPlan) -> Result<Vec<Photo>, StageError>;
}

/// Fuses aligned photos into one HDR image
pub trait FuseStage: Send + Sync {
    /// Fuse `photos` into `output`. `Ok(None)` when the tool itself failed.
    fn fuse(&self, photos: &[Photo], output: &Path) -> Result<Option<Photo>, StageError>;
}

/// Where an alignment run writes, decided before it starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignPlan {
    /// Prefix passed to the aligner; its outputs are `<prefix>NNNN.tif`
    pub prefix: PathBuf,
    /// Final name for each input, index-aligned with the photos
    pub targets: Vec<PathBuf>,
}

impl AlignPlan {
    pub fn new(prefix: impl Into<PathBuf>, targets: Vec<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            targets,
        }
    }

    /// Files the aligner is expected to write, in input order
    pub fn tool_outputs(&self) -> Vec<PathBuf> {
        (0..self.targets.len())
            .map(|index| naming::aligner_output(&self.prefix, index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tools_use_standard_binaries() {
        let tools = ToolConfig::default();
        assert_eq!(tools.converter, "darktable-cli");
        assert_eq!(tools.aligner, "align_image_stack");
        assert_eq!(tools.fuser, "enfuse");
        assert_eq!(tools.exiftool, "exiftool");
        assert_eq!(tools.retry_attempts, 3);
    }

    #[test]
    fn plan_lists_one_tool_output_per_target() {
        let plan = AlignPlan::new(
            "/p/hdr/aligned/aligned_tmp_b0002_",
            vec![PathBuf::from("/p/hdr/aligned/a_aligned.tif"), PathBuf::from("/p/hdr/aligned/b_aligned.tif")],
        );

        assert_eq!(
            plan.tool_outputs(),
            vec![
                PathBuf::from("/p/hdr/aligned/aligned_tmp_b0002_0000.tif"),
                PathBuf::from("/p/hdr/aligned/aligned_tmp_b0002_0001.tif"),
            ]
        );
    }
}

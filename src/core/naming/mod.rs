//! # Naming Module
//!
//! Deterministic file names for everything the workflow writes.
//!
//! ## HDR output
//! ```text
//! {date:YYYYMMDD}_{camera}_{first number}_x{size}_{min brightness}B_{mean EV}EV_{max ISO}ISO_{max shutter}SS_{lens}_hdr.tif
//! ```
//! Spaces become dashes. When `<output dir>/<name>` exceeds 255
//! characters the short form `{date}_{first number}_x{size}_{mean EV}EV_hdr.tif`
//! is used instead. The name depends only on bracket contents, so
//! `skip` and `fail` decisions repeat identically across runs.
//!
//! ## Intermediates
//! | Artifact        | Location                                              |
//! |-----------------|-------------------------------------------------------|
//! | converted       | `hdr/tiff/<stem>.tif`                                 |
//! | aligner output  | `hdr/aligned/aligned_tmp_b<bracket>_<index>.tif`      |
//! | aligned         | `hdr/aligned/<stem>_aligned.tif`                      |
//! | metadata backup | `<artifact>_original`                                 |
//!
//! Stems are lowercased. Rename-policy variants (`_NN` before the
//! extension) are still recognized as intermediates.

use crate::core::photo::Photo;
use crate::error::StageError;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Extension of converted, aligned and fused images
pub const IMAGE_EXTENSION: &str = "tif";

/// Longest output path accepted before falling back to the short name
pub const MAX_PATH_LENGTH: usize = 255;

/// Suffix exiftool appends to the backup it leaves next to an edited file
pub const SIDECAR_SUFFIX: &str = "_original";

/// Name the HDR image fused from `photos`, as it will be written into
/// `output_dir`.
pub fn name_hdr(photos: &[Photo], output_dir: &Path) -> Result<String, StageError> {
    let summary = BracketSummary::from_photos(photos)?;

    let long = sanitize(&format!(
        "{}_{}_{}_x{}_{}B_{}EV_{}ISO_{}SS_{}_hdr.{}",
        summary.date,
        summary.camera,
        summary.number,
        summary.size,
        summary.brightness,
        summary.exposure_value,
        summary.iso,
        summary.shutter_speed,
        summary.lens,
        IMAGE_EXTENSION
    ));

    let full_length = output_dir.join(&long).as_os_str().len();
    if full_length > MAX_PATH_LENGTH {
        tracing::info!(length = full_length, name = %long, "HDR name too long, using short form");
        return Ok(summary.short_name());
    }

    Ok(long)
}

/// The short HDR name, regardless of path length
pub fn short_hdr_name(photos: &[Photo]) -> Result<String, StageError> {
    Ok(BracketSummary::from_photos(photos)?.short_name())
}

/// Bracket-level values that go into the HDR name, already formatted
struct BracketSummary {
    date: String,
    camera: String,
    number: String,
    size: usize,
    brightness: String,
    exposure_value: String,
    iso: String,
    shutter_speed: String,
    lens: String,
}

impl BracketSummary {
    fn from_photos(photos: &[Photo]) -> Result<Self, StageError> {
        let first = photos.first().ok_or(StageError::EmptyInput { stage: "naming" })?;

        let brightness = photos
            .iter()
            .filter_map(Photo::brightness)
            .reduce(f64::min)
            .map(format_number)
            .unwrap_or_else(|| "NA".to_string());

        let values: Vec<f64> = photos.iter().filter_map(Photo::exposure_value).collect();
        let exposure_value = if values.is_empty() {
            "NA".to_string()
        } else {
            format_number(values.iter().sum::<f64>() / values.len() as f64)
        };

        let iso = photos
            .iter()
            .filter_map(Photo::iso)
            .max()
            .map(|iso| iso.to_string())
            .unwrap_or_else(|| "NA".to_string());

        let shutter_speed = photos
            .iter()
            .filter_map(Photo::shutter_speed)
            .reduce(f64::max)
            .map(format_number)
            .unwrap_or_else(|| "NA".to_string());

        Ok(Self {
            date: first
                .date()
                .map(|d| d.format("%Y%m%d").to_string())
                .unwrap_or_else(|| "00000000".to_string()),
            camera: first.camera().unwrap_or("unknown").to_string(),
            number: first
                .sequence_number()
                .map(|n| n.to_string())
                .unwrap_or_else(|| first.stem()),
            size: photos.len(),
            brightness,
            exposure_value,
            iso,
            shutter_speed,
            lens: first.lens().unwrap_or("unknown").to_string(),
        })
    }

    fn short_name(&self) -> String {
        sanitize(&format!(
            "{}_{}_x{}_{}EV_hdr.{}",
            self.date, self.number, self.size, self.exposure_value, IMAGE_EXTENSION
        ))
    }
}

/// Shortest text that reads back as `value`, always with a fractional
/// part: `2.0` -> `2.0`, `1.0 / 3.0` -> `0.3333333333333333`.
///
/// HDRs named by earlier tooling use this form, so `skip` and `fail`
/// recognize them.
pub fn format_number(value: f64) -> String {
    format!("{:?}", value)
}

/// Spaces become dashes; path separators would escape the output folder
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '-',
            other => other,
        })
        .collect()
}

/// Kinds of intermediate files a bracket may leave behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// RAW converted to TIFF
    Converted,
    /// Raw output of the alignment tool before renaming
    AlignerOutput,
    /// Aligned TIFF after renaming
    Aligned,
}

impl ArtifactKind {
    /// Human description used when refusing to delete a file
    pub fn description(&self) -> &'static str {
        match self {
            ArtifactKind::Converted => "a converted .tif intermediate",
            ArtifactKind::AlignerOutput => "an aligned_tmp_ aligner output",
            ArtifactKind::Aligned => "an _aligned.tif intermediate",
        }
    }

    /// Whether `file_name` (or its metadata backup) follows this kind's naming pattern
    pub fn matches(&self, file_name: &str) -> bool {
        let name = file_name.strip_suffix(SIDECAR_SUFFIX).unwrap_or(file_name);
        self.pattern().is_match(name)
    }

    fn pattern(&self) -> &'static Regex {
        static CONVERTED: OnceLock<Regex> = OnceLock::new();
        static ALIGNER_OUTPUT: OnceLock<Regex> = OnceLock::new();
        static ALIGNED: OnceLock<Regex> = OnceLock::new();

        match self {
            ArtifactKind::Converted => {
                CONVERTED.get_or_init(|| Regex::new(r"^[^/\\]+\.tif$").expect("valid regex"))
            }
            ArtifactKind::AlignerOutput => ALIGNER_OUTPUT
                .get_or_init(|| Regex::new(r"^aligned_tmp_b\d{4}_\d{4}\.tif$").expect("valid regex")),
            ArtifactKind::Aligned => ALIGNED
                .get_or_init(|| Regex::new(r"^[^/\\]+_aligned(_\d{2})?\.tif$").expect("valid regex")),
        }
    }
}

/// Where `photo` is converted to
pub fn converted_path(tiff_dir: &Path, photo: &Photo) -> PathBuf {
    tiff_dir.join(format!("{}.{}", photo.stem().to_lowercase(), IMAGE_EXTENSION))
}

/// Final aligned name for `photo` (the original RAW, not its TIFF)
pub fn aligned_path(aligned_dir: &Path, photo: &Photo) -> PathBuf {
    aligned_dir.join(format!(
        "{}_aligned.{}",
        photo.stem().to_lowercase(),
        IMAGE_EXTENSION
    ))
}

/// Output prefix handed to the aligner; qualified by bracket so
/// concurrent brackets never collide in the shared folder
pub fn aligner_prefix(aligned_dir: &Path, bracket: usize) -> PathBuf {
    aligned_dir.join(format!("aligned_tmp_b{:04}_", bracket))
}

/// File the aligner writes for input `index` under `prefix`
pub fn aligner_output(prefix: &Path, index: usize) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(format!("{:04}.{}", index, IMAGE_EXTENSION));
    PathBuf::from(name)
}

/// Backup exiftool leaves next to `path` after copying tags onto it
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

//! Types for the workflow module.

use super::guard::CleanupReport;
use crate::core::photo::Photo;
use crate::error::CleanupError;
use crate::events::PipelineSummary;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag for stopping a run between brackets
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; brackets already running still finish
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// How a single bracket ended
#[derive(Debug, Clone)]
pub enum BracketOutcome {
    /// A new HDR image was fused
    Created(Photo),
    /// The HDR already existed and the policy said to keep it
    Existing(Photo),
    /// Some step failed; nothing was produced
    Failed { reason: String },
}

impl BracketOutcome {
    /// The resulting HDR, if any
    pub fn hdr(&self) -> Option<&Photo> {
        match self {
            BracketOutcome::Created(photo) | BracketOutcome::Existing(photo) => Some(photo),
            BracketOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, BracketOutcome::Failed { .. })
    }
}

/// Result of processing one bracket
#[derive(Debug)]
pub struct BracketReport {
    /// 1-based position in detection order
    pub index: usize,
    /// Number of exposures in the bracket
    pub size: usize,
    /// File name of the first exposure
    pub first: String,
    pub outcome: BracketOutcome,
    pub cleanup: CleanupReport,
}

impl BracketReport {
    pub fn hdr(&self) -> Option<&Photo> {
        self.outcome.hdr()
    }
}

/// Result of a whole run
#[derive(Debug, Default)]
pub struct RunReport {
    /// HDR images produced or reused, in bracket order
    pub hdrs: Vec<Photo>,
    /// One entry per bracket that was started, in detection order
    pub brackets: Vec<BracketReport>,
    pub photos_scanned: usize,
    pub brackets_found: usize,
    /// Non-fatal problems met while scanning
    pub scan_errors: Vec<String>,
    /// Working folders left behind because they were not empty
    pub kept_dirs: Vec<PathBuf>,
    pub duration_ms: u64,
    /// The run stopped before every bracket was started
    pub cancelled: bool,
}

impl RunReport {
    /// At least one HDR exists for this run, new or reused
    pub fn is_success(&self) -> bool {
        !self.hdrs.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.brackets.len()
    }

    pub fn created(&self) -> usize {
        self.brackets
            .iter()
            .filter(|b| matches!(b.outcome, BracketOutcome::Created(_)))
            .count()
    }

    pub fn existing(&self) -> usize {
        self.brackets
            .iter()
            .filter(|b| matches!(b.outcome, BracketOutcome::Existing(_)))
            .count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &BracketReport> {
        self.brackets.iter().filter(|b| b.outcome.is_failed())
    }

    /// Files the cleanup step refused to delete
    pub fn cleanup_violations(&self) -> impl Iterator<Item = &CleanupError> {
        self.brackets.iter().flat_map(|b| b.cleanup.violations.iter())
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            photos_scanned: self.photos_scanned,
            brackets_found: self.brackets_found,
            brackets_attempted: self.attempted(),
            hdrs_created: self.created(),
            hdrs_existing: self.existing(),
            brackets_failed: self.failed().count(),
            duration_ms: self.duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::PhotoMetadata;

    fn report(index: usize, outcome: BracketOutcome) -> BracketReport {
        BracketReport {
            index,
            size: 3,
            first: format!("DSC0000{}.ARW", index),
            outcome,
            cleanup: CleanupReport::default(),
        }
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();

        clone.cancel();

        assert!(token.is_cancelled());
    }

    #[test]
    fn empty_report_is_not_success() {
        assert!(!RunReport::default().is_success());
    }

    #[test]
    fn summary_counts_outcomes() {
        let hdr = Photo::new("/p/hdr/a_hdr.tif", PhotoMetadata::default());
        let old = Photo::new("/p/hdr/b_hdr.tif", PhotoMetadata::default());
        let run = RunReport {
            hdrs: vec![hdr.clone(), old.clone()],
            brackets: vec![
                report(1, BracketOutcome::Created(hdr)),
                report(2, BracketOutcome::Existing(old)),
                report(
                    3,
                    BracketOutcome::Failed {
                        reason: "align produced no usable output".to_string(),
                    },
                ),
            ],
            photos_scanned: 9,
            brackets_found: 4,
            ..Default::default()
        };

        let summary = run.summary();

        assert!(run.is_success());
        assert_eq!(summary.brackets_found, 4);
        assert_eq!(summary.brackets_attempted, 3);
        assert_eq!(summary.hdrs_created, 1);
        assert_eq!(summary.hdrs_existing, 1);
        assert_eq!(summary.brackets_failed, 1);
    }
}

//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the HDR workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Directory scanning events
    Scan(ScanEvent),
    /// Per-bracket processing events
    Bracket(BracketEvent),
    /// Run-level events
    Pipeline(PipelineEvent),
}

/// Events while enumerating photos in the base directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { path: PathBuf },
    /// A RAW photo was found
    PhotoFound { path: PathBuf },
    /// Scanning completed
    Completed { total_photos: usize },
}

/// Events while processing a single bracket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BracketEvent {
    /// Brackets were detected and are about to be processed
    Detected { total_brackets: usize, total_photos: usize },
    /// A bracket has been named and processing begins
    Started {
        index: usize,
        size: usize,
        name: String,
    },
    /// A bracket moved to another stage
    StageChanged { index: usize, stage: BracketStage },
    /// An HDR image was written
    Completed { index: usize, output: PathBuf },
    /// The HDR already existed and was reused
    Skipped { index: usize, existing: PathBuf },
    /// The bracket failed; the run continues
    Failed { index: usize, reason: String },
}

/// States a bracket moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BracketStage {
    Named,
    Converting,
    Aligning,
    Fusing,
    CleaningUp,
}

/// Run-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Run has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Run finished
    Completed { summary: PipelineSummary },
    /// Run was interrupted between brackets
    Cancelled,
}

/// Phases of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    Detecting,
    Processing,
    Tidying,
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub photos_scanned: usize,
    pub brackets_found: usize,
    pub brackets_attempted: usize,
    pub hdrs_created: usize,
    pub hdrs_existing: usize,
    pub brackets_failed: usize,
    pub duration_ms: u64,
}

impl std::fmt::Display for BracketStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BracketStage::Named => write!(f, "Naming"),
            BracketStage::Converting => write!(f, "Converting"),
            BracketStage::Aligning => write!(f, "Aligning"),
            BracketStage::Fusing => write!(f, "Fusing"),
            BracketStage::CleaningUp => write!(f, "Cleaning up"),
        }
    }
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::Detecting => write!(f, "Finding brackets"),
            PipelinePhase::Processing => write!(f, "Processing brackets"),
            PipelinePhase::Tidying => write!(f, "Tidying working folders"),
        }
    }
}

//! # Workflow Module
//!
//! Orchestrates the HDR run for one directory.
//!
//! ## Run Phases
//! 1. **Scan** - List the RAW photos at the top of the base directory
//! 2. **Detect** - Group them into exposure brackets
//! 3. **Process** - For each bracket: name the HDR, convert, align, fuse
//! 4. **Tidy** - Remove the working folders if they are empty
//!
//! Each bracket moves through `Named → Converting → Aligning → Fusing →
//! CleaningUp`. A failing bracket is reported and the run carries on.
//! Intermediates are owned by an [`ArtifactGuard`] so they are removed
//! on every exit path.
//!
//! ## Parallelism
//! With more than one worker, brackets run on a rayon pool. Temporary
//! aligner outputs carry the bracket index, so brackets never share a
//! file name in the common working folders.

mod executor;
mod guard;
mod types;
mod workarea;

pub use executor::{HdrWorkflow, HdrWorkflowBuilder, WorkflowConfig};
pub use guard::{ArtifactGuard, CleanupReport};
pub use types::{BracketOutcome, BracketReport, CancellationToken, RunReport};
pub use workarea::{WorkArea, ALIGNED_DIR, HDR_DIR, TIFF_DIR};

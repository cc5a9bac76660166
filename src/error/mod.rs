//! # Error Module
//!
//! Error types for the HDR bracket workflow.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, tool names, what went wrong
//! - **Scope failures** - stage and conflict errors stop one bracket, never the run

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum HdrError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    #[error("Conflict error: {0}")]
    Conflict(#[from] ConflictError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while enumerating photos
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by an external-tool stage (convert, align, fuse)
#[derive(Error, Debug)]
pub enum StageError {
    #[error("No photos provided to {stage}")]
    EmptyInput { stage: &'static str },

    #[error("{stage} needs at least {required} photos, got {found}")]
    NotEnoughInputs {
        stage: &'static str,
        found: usize,
        required: usize,
    },

    #[error("{stage} produced no usable output")]
    NoOutput { stage: &'static str },

    #[error("Failed to start {tool}: {source}. Is it installed and on PATH?")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with code {code:?}: {stderr}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{stage} reported success but {path} was not created")]
    MissingOutput { stage: &'static str, path: PathBuf },

    #[error("File operation failed on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors produced while resolving a path collision
#[derive(Error, Debug)]
pub enum ConflictError {
    #[error("File already exists: {path}")]
    Exists { path: PathBuf },

    #[error("No available filename for {path} after {attempts} attempts")]
    Exhausted { path: PathBuf, attempts: u32 },

    #[error("Failed to remove existing file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors produced while deleting intermediate artifacts
#[derive(Error, Debug)]
pub enum CleanupError {
    #[error("Refusing to delete {path}: it does not look like {expected}")]
    UnexpectedArtifact { path: PathBuf, expected: &'static str },

    #[error("Failed to delete {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, HdrError>;

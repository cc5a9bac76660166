//! Scoped ownership of a bracket's intermediate files.

use crate::core::naming::{self, ArtifactKind};
use crate::error::CleanupError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// What happened to the artifacts of one bracket
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Files removed (or that would be removed in a dry run)
    pub deleted: Vec<PathBuf>,
    /// Registered files that were never created
    pub missing: usize,
    /// Files the guard refused to touch because they are not intermediates
    pub violations: Vec<CleanupError>,
    /// Intermediates that could not be removed
    pub failures: Vec<CleanupError>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.failures.is_empty()
    }
}

#[derive(Debug)]
struct Artifact {
    path: PathBuf,
    kind: ArtifactKind,
    dir: PathBuf,
}

/// Deletes every registered intermediate exactly once, however the
/// bracket ends.
///
/// Paths are registered before the stage that writes them runs, along
/// with the exiftool backup next to each one. [`finish`](Self::finish)
/// performs the deletion and returns a report; if the guard is dropped
/// without finishing (a panicking stage), `Drop` does the same work and
/// logs the result.
///
/// A registered path outside its working directory, or whose name does
/// not follow the intermediate naming convention, is never deleted.
#[derive(Debug)]
pub struct ArtifactGuard {
    bracket: usize,
    dry_run: bool,
    artifacts: Vec<Artifact>,
}

impl ArtifactGuard {
    pub fn new(bracket: usize, dry_run: bool) -> Self {
        Self {
            bracket,
            dry_run,
            artifacts: Vec::new(),
        }
    }

    /// Take ownership of `path` (and its metadata backup) as a `kind`
    /// intermediate living in `dir`
    pub fn register(&mut self, path: &Path, kind: ArtifactKind, dir: &Path) {
        for path in [path.to_path_buf(), naming::sidecar_path(path)] {
            if self.artifacts.iter().any(|a| a.path == path) {
                continue;
            }
            self.artifacts.push(Artifact {
                path,
                kind,
                dir: dir.to_path_buf(),
            });
        }
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Remove every registered file and report the outcome
    pub fn finish(mut self) -> CleanupReport {
        self.cleanup()
    }

    fn cleanup(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();

        for artifact in self.artifacts.drain(..) {
            if let Err(violation) = check(&artifact) {
                tracing::error!(
                    bracket = self.bracket,
                    path = %artifact.path.display(),
                    "{}",
                    violation
                );
                report.violations.push(violation);
                continue;
            }

            if self.dry_run {
                tracing::debug!(path = %artifact.path.display(), "Would delete intermediate");
                report.deleted.push(artifact.path);
                continue;
            }

            match fs::remove_file(&artifact.path) {
                Ok(()) => {
                    tracing::debug!(path = %artifact.path.display(), "Deleted intermediate");
                    report.deleted.push(artifact.path);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => report.missing += 1,
                Err(source) => {
                    tracing::warn!(
                        bracket = self.bracket,
                        path = %artifact.path.display(),
                        error = %source,
                        "Could not delete intermediate"
                    );
                    report.failures.push(CleanupError::Io {
                        path: artifact.path,
                        source,
                    });
                }
            }
        }

        report
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if self.artifacts.is_empty() {
            return;
        }
        let report = self.cleanup();
        tracing::warn!(
            bracket = self.bracket,
            deleted = report.deleted.len(),
            violations = report.violations.len(),
            failures = report.failures.len(),
            "Cleaned up intermediates of an interrupted bracket"
        );
    }
}

fn check(artifact: &Artifact) -> Result<(), CleanupError> {
    let in_dir = artifact.path.parent() == Some(artifact.dir.as_path());
    let named = artifact
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| artifact.kind.matches(n));

    if in_dir && named {
        Ok(())
    } else {
        Err(CleanupError::UnexpectedArtifact {
            path: artifact.path.clone(),
            expected: artifact.kind.description(),
        })
    }
}

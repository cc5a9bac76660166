//! # Conflict Module
//!
//! Decides what to do when the workflow wants to write to a path that
//! already exists. The same policy covers converted and aligned
//! intermediates as well as the final HDR file.
//!
//! | Policy      | Outcome                                        |
//! |-------------|------------------------------------------------|
//! | `Overwrite` | existing file deleted, proceed at the same path |
//! | `Rename`    | proceed at `<stem>_01.<ext>` .. `<stem>_99.<ext>` |
//! | `Skip`      | keep the existing file, do not recreate it     |
//! | `Fail`      | error, stops the current bracket               |

use crate::error::ConflictError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Highest numeric suffix tried by the `Rename` policy
pub const MAX_RENAME_ATTEMPTS: u32 = 99;

/// How to handle a file that already exists at a target path
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Delete the existing file and write in its place
    #[default]
    Overwrite,
    /// Write next to it under a numbered name
    Rename,
    /// Keep the existing file as the result
    Skip,
    /// Stop processing the current bracket
    Fail,
}

impl std::fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictPolicy::Overwrite => write!(f, "overwrite"),
            ConflictPolicy::Rename => write!(f, "rename"),
            ConflictPolicy::Skip => write!(f, "skip"),
            ConflictPolicy::Fail => write!(f, "fail"),
        }
    }
}

/// What the caller should do after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictAction {
    /// Write to this path (the original one, or a free alternative)
    ProceedAt(PathBuf),
    /// Leave the existing file alone and treat it as the result
    Skip,
}

/// Applies one policy to every collision of a run
#[derive(Debug, Clone, Copy)]
pub struct ConflictResolver {
    policy: ConflictPolicy,
    dry_run: bool,
}

impl ConflictResolver {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            dry_run: false,
        }
    }

    /// In dry-run mode `Overwrite` only logs the delete it would perform
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Resolve a write to `desired`.
    ///
    /// A path that does not exist resolves to itself under every policy.
    pub fn resolve(&self, desired: &Path) -> Result<ConflictAction, ConflictError> {
        if !desired.exists() {
            return Ok(ConflictAction::ProceedAt(desired.to_path_buf()));
        }

        match self.policy {
            ConflictPolicy::Overwrite => {
                if self.dry_run {
                    tracing::info!(path = %desired.display(), "Would delete existing file");
                } else {
                    tracing::debug!(path = %desired.display(), "Overwriting existing file");
                    fs::remove_file(desired).map_err(|source| ConflictError::Io {
                        path: desired.to_path_buf(),
                        source,
                    })?;
                }
                Ok(ConflictAction::ProceedAt(desired.to_path_buf()))
            }
            ConflictPolicy::Rename => {
                let path = next_free_path(desired)?;
                tracing::debug!(from = %desired.display(), to = %path.display(), "Renaming output");
                Ok(ConflictAction::ProceedAt(path))
            }
            ConflictPolicy::Skip => {
                tracing::debug!(path = %desired.display(), "Keeping existing file");
                Ok(ConflictAction::Skip)
            }
            ConflictPolicy::Fail => Err(ConflictError::Exists {
                path: desired.to_path_buf(),
            }),
        }
    }
}

/// Resolve a single collision with `policy`
pub fn resolve(desired: &Path, policy: ConflictPolicy) -> Result<ConflictAction, ConflictError> {
    ConflictResolver::new(policy).resolve(desired)
}

/// Numbered alternative for `path`: `<stem>_NN.<ext>` in the same folder
pub fn numbered_path(path: &Path, n: u32) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{:02}.{}", stem, n, ext),
        None => format!("{}_{:02}", stem, n),
    };
    path.with_file_name(name)
}

fn next_free_path(path: &Path) -> Result<PathBuf, ConflictError> {
    (1..=MAX_RENAME_ATTEMPTS)
        .map(|n| numbered_path(path, n))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| ConflictError::Exhausted {
            path: path.to_path_buf(),
            attempts: MAX_RENAME_ATTEMPTS,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn existing(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        File::create(&path).unwrap();
        path
    }

    #[test]
    fn free_path_proceeds_under_every_policy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.tif");
        for policy in [
            ConflictPolicy::Overwrite,
            ConflictPolicy::Rename,
            ConflictPolicy::Skip,
            ConflictPolicy::Fail,
        ] {
            assert_eq!(
                resolve(&path, policy).unwrap(),
                ConflictAction::ProceedAt(path.clone())
            );
        }
    }

    #[test]
    fn overwrite_removes_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = existing(&dir, "hdr.tif");

        let action = resolve(&path, ConflictPolicy::Overwrite).unwrap();

        assert_eq!(action, ConflictAction::ProceedAt(path.clone()));
        assert!(!path.exists());
    }

    #[test]
    fn overwrite_in_dry_run_keeps_file() {
        let dir = TempDir::new().unwrap();
        let path = existing(&dir, "hdr.tif");

        let resolver = ConflictResolver::new(ConflictPolicy::Overwrite).dry_run(true);
        resolver.resolve(&path).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn rename_returns_first_free_suffix() {
        let dir = TempDir::new().unwrap();
        let path = existing(&dir, "hdr.tif");
        existing(&dir, "hdr_01.tif");

        let action = resolve(&path, ConflictPolicy::Rename).unwrap();

        assert_eq!(action, ConflictAction::ProceedAt(dir.path().join("hdr_02.tif")));
        assert!(path.exists());
    }

    #[test]
    fn rename_never_returns_existing_path() {
        let dir = TempDir::new().unwrap();
        let path = existing(&dir, "a.tif");
        for n in [1, 2, 3, 5] {
            existing(&dir, &format!("a_{:02}.tif", n));
        }

        match resolve(&path, ConflictPolicy::Rename).unwrap() {
            ConflictAction::ProceedAt(p) => {
                assert!(!p.exists());
                assert_eq!(p, dir.path().join("a_04.tif"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rename_gives_up_after_99_attempts() {
        let dir = TempDir::new().unwrap();
        let path = existing(&dir, "a.tif");
        for n in 1..=MAX_RENAME_ATTEMPTS {
            existing(&dir, &format!("a_{:02}.tif", n));
        }

        let err = resolve(&path, ConflictPolicy::Rename).unwrap_err();
        assert!(matches!(err, ConflictError::Exhausted { attempts: 99, .. }));
    }

    #[test]
    fn skip_keeps_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = existing(&dir, "hdr.tif");

        assert_eq!(resolve(&path, ConflictPolicy::Skip).unwrap(), ConflictAction::Skip);
        assert!(path.exists());
    }

    #[test]
    fn fail_errors_without_deleting() {
        let dir = TempDir::new().unwrap();
        let path = existing(&dir, "hdr.tif");

        let err = resolve(&path, ConflictPolicy::Fail).unwrap_err();

        assert!(matches!(err, ConflictError::Exists { .. }));
        assert!(path.exists());
    }

    #[test]
    fn numbered_path_handles_missing_extension() {
        assert_eq!(numbered_path(Path::new("/x/file"), 7), PathBuf::from("/x/file_07"));
        assert_eq!(numbered_path(Path::new("/x/a.b.tif"), 12), PathBuf::from("/x/a.b_12.tif"));
    }

    #[test]
    fn policy_serializes_snake_case() {
        let json = serde_json::to_string(&ConflictPolicy::Overwrite).unwrap();
        assert_eq!(json, "\"overwrite\"");
        assert_eq!(ConflictPolicy::Rename.to_string(), "rename");
    }
}

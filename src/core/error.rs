//! Error taxonomy for the overwrite protocol.
//!
//! Every failure is surfaced as a distinct, inspectable variant; nothing
//! is retried and nothing is treated as process-fatal here. The finalize
//! errors carry the path of the temp file that still holds the new
//! content, so a caller can recover it manually.

use std::io;
use std::path::{Path, PathBuf};

/// Failures while classifying and opening a target path.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// The existence check failed for a reason other than "not found"
    /// (which is the normal new-file branch).
    #[error("stat {}: {}", path.display(), source)]
    Stat { path: PathBuf, source: io::Error },

    /// Creating a brand-new target failed.
    #[error("create {}: {}", path.display(), source)]
    Create { path: PathBuf, source: io::Error },

    /// Opening a character or block device for direct writing failed.
    #[error("open device {}: {}", path.display(), source)]
    OpenDevice { path: PathBuf, source: io::Error },

    /// Creating the temp file next to the target failed. No filesystem
    /// state was changed.
    #[error("create temp file in {}: {}", dir.display(), source)]
    CreateTemp { dir: PathBuf, source: io::Error },

    /// The confirmation function declined the overwrite. Not an I/O
    /// fault; callers usually treat this as "skip this file".
    #[error("overwrite rejected")]
    OverwriteRejected,
}

/// Failures while finalizing a write session.
///
/// [`FinalizeError::Backup`] and [`FinalizeError::Replace`] leave the
/// temp file on disk; [`FinalizeError::working_file`] returns its path.
#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    /// Flushing/closing the temp stream failed. Neither the target nor
    /// the temp file has been renamed.
    #[error("close {}: {}", path.display(), source)]
    Close { path: PathBuf, source: io::Error },

    /// Renaming the target to its backup path failed. The target still
    /// holds its original content and the temp file still holds the new
    /// content; nothing was changed or lost.
    #[error("failed to backup: {} -> {}: {}", target.display(), backup.display(), source)]
    Backup {
        target: PathBuf,
        backup: PathBuf,
        source: io::Error,
        /// Leftover temp file holding the new content.
        tmp: PathBuf,
    },

    /// Renaming the temp file onto the target failed. If a backup was
    /// taken first, the target path is absent until the temp file is
    /// renamed into place manually.
    #[error("failed to replace: {} -> {}: {}", tmp.display(), target.display(), source)]
    Replace {
        tmp: PathBuf,
        target: PathBuf,
        source: io::Error,
    },
}

impl FinalizeError {
    /// Path of the leftover temp file that still holds the new content,
    /// for manual recovery.
    pub fn working_file(&self) -> Option<&Path> {
        match self {
            FinalizeError::Backup { tmp, .. } | FinalizeError::Replace { tmp, .. } => Some(tmp),
            FinalizeError::Close { .. } => None,
        }
    }
}

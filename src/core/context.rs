//! Open gate: classifies a target path and hands out a write handle.
//!
//! A [`WriteContext`] owns the status registry for one logical run.
//! Construct one per run (or per test) and thread it through every
//! open/finalize call; two contexts never share backup history.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::{FinalizeError, OpenError};
use crate::core::handle::{Finalized, Handle, ManagedOverwrite};
use crate::core::registry::{Status, StatusRegistry};

/// Read-only view of an overwrite target, passed to the confirmation
/// decision function before an existing regular file is touched.
#[derive(Debug)]
pub struct OverwriteInfo {
    /// Target path, exactly as supplied by the caller.
    pub path: PathBuf,

    /// The target's permission bits at open time.
    pub permissions: fs::Permissions,

    /// How this run has already handled the path. `Overwrite` means a
    /// backup was already taken, so confirming again will not clobber it.
    pub status: Status,
}

impl OverwriteInfo {
    /// Whether the target lacks its owner write bit. Useful for prompts
    /// that want to warn louder before replacing a read-only file.
    pub fn read_only(&self) -> bool {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            self.permissions.mode() & 0o200 == 0
        }
        #[cfg(not(unix))]
        {
            self.permissions.readonly()
        }
    }
}

/// Carries the per-run status registry; the entry point for opening and
/// finalizing targets.
///
/// Not internally synchronized: callers must not run open/finalize for
/// the same path concurrently from multiple threads.
#[derive(Debug, Default)]
pub struct WriteContext {
    registry: StatusRegistry,
}

impl WriteContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status this run has recorded for `path`.
    pub fn status(&self, path: impl AsRef<Path>) -> Status {
        self.registry.lookup(path.as_ref())
    }

    /// Open `path` for writing, asking `confirm` before an existing
    /// regular file is put at risk.
    ///
    /// Classification:
    /// - nonexistent path: created directly, `confirm` never invoked;
    /// - character/block device: opened for writing in place, `confirm`
    ///   never invoked;
    /// - existing regular file: `confirm` is invoked exactly once with
    ///   an [`OverwriteInfo`]; on `true`, a uniquely named temp file is
    ///   created in the target's directory (same filesystem, so the
    ///   final rename is atomic) and writes go there until
    ///   [`finalize`](WriteContext::finalize).
    ///
    /// `confirm` runs synchronously and may block, e.g. on terminal
    /// input. On `false`, no filesystem state is touched.
    pub fn open<F>(&mut self, path: impl AsRef<Path>, confirm: F) -> Result<Handle, OpenError>
    where
        F: FnOnce(&OverwriteInfo) -> bool,
    {
        let path = path.as_ref();

        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // The status is recorded even when creation itself
                // fails, matching how the overwrite history behaves.
                self.registry.record(path, Status::Create);
                let file = File::create(path).map_err(|source| OpenError::Create {
                    path: path.to_path_buf(),
                    source,
                })?;
                debug!(path = %path.display(), "created new target");
                return Ok(Handle::NewFile {
                    file,
                    target: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(OpenError::Stat {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        if is_device(&meta.file_type()) {
            let file = OpenOptions::new().write(true).open(path).map_err(|source| {
                OpenError::OpenDevice {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            debug!(path = %path.display(), "opened device for in-place writing");
            return Ok(Handle::DeviceFile {
                file,
                target: path.to_path_buf(),
            });
        }

        let info = OverwriteInfo {
            path: path.to_path_buf(),
            permissions: meta.permissions(),
            status: self.registry.lookup(path),
        };
        if !confirm(&info) {
            debug!(path = %path.display(), "overwrite rejected by caller");
            return Err(OpenError::OverwriteRejected);
        }

        let (file, tmp) = create_temp(path)?;
        debug!(
            target = %path.display(),
            tmp = %tmp.display(),
            "opened managed overwrite session"
        );
        Ok(Handle::ManagedOverwrite(ManagedOverwrite::new(
            file,
            path.to_path_buf(),
            tmp,
            meta.permissions(),
        )))
    }

    /// Finalize `handle`, consuming it.
    ///
    /// New-file handles are flushed and closed; device handles are
    /// closed without fsync and any close error is ignored. Managed
    /// handles run the backup-then-replace sequence: on the first
    /// finalize for a path in this run, the target is renamed to
    /// `path~` before the temp file is renamed into place; later
    /// finalizes for the same path skip the backup. Every failure mode
    /// leaves the new content reachable, either at the target or at the
    /// temp path carried by the error.
    pub fn finalize(&mut self, handle: Handle) -> Result<Finalized, FinalizeError> {
        handle.finalize(&mut self.registry)
    }
}

/// Create a uniquely named `<basename>.tmp-<random>` file in the
/// target's directory. The temp file is detached from delete-on-drop:
/// when finalize fails it must survive as a recovery artifact.
fn create_temp(target: &Path) -> Result<(File, PathBuf), OpenError> {
    let dir = match target.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };

    let mut prefix = target.file_name().map(OsString::from).unwrap_or_default();
    prefix.push(".tmp-");

    let tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .tempfile_in(dir)
        .map_err(|source| OpenError::CreateTemp {
            dir: dir.to_path_buf(),
            source,
        })?;

    tmp.keep().map_err(|e| OpenError::CreateTemp {
        dir: dir.to_path_buf(),
        source: e.error,
    })
}

#[cfg(unix)]
fn is_device(ty: &fs::FileType) -> bool {
    use std::os::unix::fs::FileTypeExt;
    ty.is_char_device() || ty.is_block_device()
}

#[cfg(not(unix))]
fn is_device(_ty: &fs::FileType) -> bool {
    false
}

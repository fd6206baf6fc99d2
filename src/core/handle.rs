//! Write handles and the backup-then-replace finalize sequence.
//!
//! A [`Handle`] is what [`WriteContext::open`](crate::core::context::WriteContext::open)
//! hands back: a closed set of three cases the caller can branch on.
//! Only the managed case owns a temp file and goes through the rename
//! dance on finalize; the other two write straight to the target.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::core::error::FinalizeError;
use crate::core::registry::{Status, StatusRegistry};

/// Suffix appended to the target path to form the backup path.
pub const BACKUP_SUFFIX: &str = "~";

/// An open write destination produced by the open gate.
///
/// Implements [`io::Write`] and [`io::Seek`]; bytes land either directly
/// on the target (`NewFile`, `DeviceFile`) or in a same-directory temp
/// file (`ManagedOverwrite`). A handle must be finalized exactly once;
/// a managed handle dropped without finalize leaks its temp file on disk.
#[derive(Debug)]
pub enum Handle {
    /// The target did not exist and was created directly. No temp file,
    /// no backup on finalize.
    NewFile { file: File, target: PathBuf },

    /// The target is a character or block device, written in place.
    /// Devices cannot be atomically replaced by rename, and their
    /// finalize is a plain close: no fsync, and close errors are not
    /// surfaced.
    DeviceFile { file: File, target: PathBuf },

    /// An existing regular file being replaced through a temp file.
    ManagedOverwrite(ManagedOverwrite),
}

/// Managed write session for an existing regular file.
///
/// Owns the open temp file plus everything finalize needs: the target
/// path, the temp path, and the target's permission bits captured at
/// open time.
#[derive(Debug)]
pub struct ManagedOverwrite {
    file: File,
    target: PathBuf,
    tmp: PathBuf,
    perm: fs::Permissions,
}

impl ManagedOverwrite {
    pub(crate) fn new(file: File, target: PathBuf, tmp: PathBuf, perm: fs::Permissions) -> Self {
        Self {
            file,
            target,
            tmp,
            perm,
        }
    }

    /// Temp file currently receiving the new content.
    pub fn temp_path(&self) -> &Path {
        &self.tmp
    }

    fn finalize(self, registry: &mut StatusRegistry) -> Result<Finalized, FinalizeError> {
        let ManagedOverwrite {
            file,
            target,
            tmp,
            perm,
        } = self;

        // Flush the new content to disk before touching any names. On
        // failure, neither the target nor the temp file has moved.
        file.sync_all().map_err(|source| FinalizeError::Close {
            path: tmp.clone(),
            source,
        })?;
        drop(file);

        let backup = backup_path(&target);

        // Backup at most once per path per run: a second save must not
        // replace the first-generation backup with second-generation
        // "old" content.
        if registry.lookup(&target) == Status::None {
            match fs::rename(&target, &backup) {
                Ok(()) => {
                    registry.record(&target, Status::Overwrite);
                    debug!(
                        target = %target.display(),
                        backup = %backup.display(),
                        "moved original to backup"
                    );
                }
                Err(source) => {
                    return Err(FinalizeError::Backup {
                        target,
                        backup,
                        source,
                        tmp,
                    });
                }
            }
        } else {
            trace!(target = %target.display(), "backup already taken this run");
        }

        if let Err(source) = fs::rename(&tmp, &target) {
            return Err(FinalizeError::Replace {
                tmp,
                target,
                source,
            });
        }

        debug!(target = %target.display(), "replaced target with new content");
        Ok(Finalized {
            target,
            perm: Some(perm),
        })
    }
}

impl Handle {
    /// The final destination path, for every kind of handle. Managed
    /// handles report the target, not the temp file they write into.
    pub fn path(&self) -> &Path {
        match self {
            Handle::NewFile { target, .. } | Handle::DeviceFile { target, .. } => target,
            Handle::ManagedOverwrite(m) => &m.target,
        }
    }

    pub(crate) fn finalize(self, registry: &mut StatusRegistry) -> Result<Finalized, FinalizeError> {
        match self {
            Handle::NewFile { file, target } => {
                file.sync_all().map_err(|source| FinalizeError::Close {
                    path: target.clone(),
                    source,
                })?;
                Ok(Finalized { target, perm: None })
            }
            // Plain close; fsync is not meaningful for device nodes,
            // so any close error is ignored here.
            Handle::DeviceFile { file, target } => {
                drop(file);
                Ok(Finalized { target, perm: None })
            }
            Handle::ManagedOverwrite(m) => m.finalize(registry),
        }
    }

    fn file_mut(&mut self) -> &mut File {
        match self {
            Handle::NewFile { file, .. } | Handle::DeviceFile { file, .. } => file,
            Handle::ManagedOverwrite(m) => &mut m.file,
        }
    }
}

impl io::Write for Handle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file_mut().flush()
    }
}

impl io::Seek for Handle {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        self.file_mut().seek(pos)
    }
}

/// Receipt for a successfully finalized handle.
///
/// Carries what deferred permission restoration needs; hand it to
/// [`restore_permissions`](Finalized::restore_permissions) once the run
/// is done writing, or to a
/// [`PermTracker`](crate::infra::track::PermTracker) for bulk restore.
#[derive(Debug)]
pub struct Finalized {
    target: PathBuf,
    perm: Option<fs::Permissions>,
}

impl Finalized {
    /// The finalized target path.
    pub fn path(&self) -> &Path {
        &self.target
    }

    /// Restore the target's permission bits to the value observed at
    /// open time.
    ///
    /// The temp file that became the target was created with default
    /// creation bits, not the original's. Restoration is deliberately
    /// not part of finalize: if the original was read-only, flipping the
    /// new file read-only immediately would make a second save in the
    /// same run fail. Call this once the run is done writing.
    ///
    /// No-op for receipts from `NewFile` and `DeviceFile` handles, which
    /// never diverged from the original file identity. Idempotent.
    pub fn restore_permissions(&self) -> io::Result<()> {
        match &self.perm {
            Some(perm) => {
                trace!(target = %self.target.display(), "restoring original permissions");
                fs::set_permissions(&self.target, perm.clone())
            }
            None => Ok(()),
        }
    }
}

/// Backup path for a target: the same path with [`BACKUP_SUFFIX`]
/// appended (`a.txt` becomes `a.txt~`).
fn backup_path(target: &Path) -> PathBuf {
    let mut os = target.as_os_str().to_owned();
    os.push(BACKUP_SUFFIX);
    PathBuf::from(os)
}

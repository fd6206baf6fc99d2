//! Per-run status registry: which targets have been created or
//! overwritten-with-backup during this run.
//!
//! The registry records the *history* of how a path was handled, not the
//! state of the file on disk. Its one job is to drive the once-per-run
//! backup policy: the first overwrite of a path renames the original to
//! `path~`, and every later save of the same path skips the backup so the
//! first-generation copy is never clobbered.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// How a target path has been handled within one [`StatusRegistry`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Status {
    /// No write has gone through this registry for the path yet.
    #[default]
    None,

    /// The path did not exist and was created directly, with no temp
    /// file and no backup.
    Create,

    /// An existing regular file was replaced through a temp file, after
    /// its original content was renamed to the backup path.
    Overwrite,
}

/// Mapping from target path to [`Status`] for one logical run.
///
/// Keys are the literal paths supplied by the caller; no canonicalization
/// is performed, so `./a.txt` and `a.txt` are tracked as unrelated
/// entries. There is no internal locking: callers must not run
/// open/finalize for the same path concurrently.
#[derive(Debug, Default)]
pub struct StatusRegistry {
    entries: HashMap<PathBuf, Status>,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status recorded for `path`, or [`Status::None`] if absent.
    pub fn lookup(&self, path: &Path) -> Status {
        self.entries.get(path).copied().unwrap_or_default()
    }

    /// Record a forward transition for `path`.
    ///
    /// Transitions only move forward: once a path holds `Create` or
    /// `Overwrite` it keeps its first value, and recording `None` is a
    /// no-op. A status is never reset within a run.
    pub fn record(&mut self, path: &Path, status: Status) {
        if status == Status::None {
            return;
        }
        self.entries.entry(path.to_path_buf()).or_insert(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_paths_default_to_none() {
        let reg = StatusRegistry::new();
        assert_eq!(reg.lookup(Path::new("nope.txt")), Status::None);
    }

    #[test]
    fn first_recorded_value_wins() {
        let mut reg = StatusRegistry::new();
        let p = Path::new("a.txt");

        reg.record(p, Status::Create);
        assert_eq!(reg.lookup(p), Status::Create);

        // Later transitions must not replace the first one.
        reg.record(p, Status::Overwrite);
        assert_eq!(reg.lookup(p), Status::Create);
    }

    #[test]
    fn recording_none_is_a_noop() {
        let mut reg = StatusRegistry::new();
        let p = Path::new("a.txt");

        reg.record(p, Status::None);
        assert_eq!(reg.lookup(p), Status::None);

        reg.record(p, Status::Overwrite);
        reg.record(p, Status::None);
        assert_eq!(reg.lookup(p), Status::Overwrite);
    }

    #[test]
    fn keys_are_literal_not_canonicalized() {
        let mut reg = StatusRegistry::new();
        reg.record(Path::new("./a.txt"), Status::Overwrite);

        // Same file on disk, different spelling: tracked separately.
        assert_eq!(reg.lookup(Path::new("a.txt")), Status::None);
        assert_eq!(reg.lookup(Path::new("./a.txt")), Status::Overwrite);
    }
}

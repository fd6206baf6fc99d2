//! **safewrite** - Safe overwrite primitive for CLI and batch tools
//!
//! Regenerating an output file must never corrupt it on partial failure
//! and must never silently clobber something the user did not intend to
//! touch. safewrite writes new content to a uniquely named temp file in
//! the target's directory, keeps a once-per-run `path~` backup of the
//! original, and only replaces the target with an atomic same-filesystem
//! rename. Existing regular files are only touched after a caller-supplied
//! confirmation function says yes.
//!
//! ```no_run
//! use std::io::Write;
//! use safewrite::WriteContext;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut ctx = WriteContext::new();
//! let mut out = ctx.open("report.txt", |info| !info.read_only())?;
//! writeln!(out, "generated")?;
//! let receipt = ctx.finalize(out)?;
//! receipt.restore_permissions()?;
//! # Ok(())
//! # }
//! ```

/// Core overwrite protocol - classification, finalize, error taxonomy
pub mod core {
    /// Per-run status registry (created vs overwritten-with-backup)
    pub mod registry;
    pub use registry::{Status, StatusRegistry};

    /// Open gate: classifies targets and hands out write handles
    pub mod context;
    pub use context::{OverwriteInfo, WriteContext};

    /// Write handles and the backup-then-replace finalize sequence
    pub mod handle;
    pub use handle::{BACKUP_SUFFIX, Finalized, Handle, ManagedOverwrite};

    /// Error taxonomy with recoverable working-file support
    pub mod error;
    pub use error::{FinalizeError, OpenError};
}

/// Infrastructure layered on the core
pub mod infra {
    /// End-of-run bulk permission restoration
    pub mod track;
    pub use track::PermTracker;
}

// Strategic re-exports for a flat public API
pub use crate::core::{
    BACKUP_SUFFIX, Finalized, FinalizeError, Handle, ManagedOverwrite, OpenError, OverwriteInfo,
    Status, StatusRegistry, WriteContext,
};
pub use crate::infra::PermTracker;

//! End-of-run bulk permission restoration.
//!
//! Thin aggregator over [`Finalized::restore_permissions`]: collect the
//! receipt from each save as it completes, then restore everything in
//! one pass once the run is done writing, typically right before exit.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::handle::Finalized;

/// Remembers the first finalize receipt seen per target path.
///
/// Only the first receipt matters: it carries the permission bits the
/// target had before this run touched it. Later saves of the same path
/// are ignored so repeated tracking cannot replace the original bits
/// with bits the run itself produced.
#[derive(Debug, Default)]
pub struct PermTracker {
    seen: HashMap<PathBuf, Finalized>,
}

impl PermTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `receipt`, keyed by its target path. Keeps the first
    /// receipt per path; later ones for the same path are dropped.
    pub fn track(&mut self, receipt: Finalized) {
        self.seen
            .entry(receipt.path().to_path_buf())
            .or_insert(receipt);
    }

    /// Number of distinct targets currently tracked.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Restore permissions for every tracked target, then clear the
    /// tracker.
    ///
    /// Stops at the first failure and leaves the tracker populated so
    /// the caller can retry; on success the tracker is empty and a
    /// second call is a no-op.
    pub fn restore_all(&mut self) -> Result<()> {
        for receipt in self.seen.values() {
            receipt
                .restore_permissions()
                .with_context(|| format!("restore permissions: {}", receipt.path().display()))?;
        }
        debug!(targets = self.seen.len(), "restored tracked permissions");
        self.seen.clear();
        Ok(())
    }
}

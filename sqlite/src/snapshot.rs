//! Pre-batch snapshot and failure rollback.
//!
//! Before a batch runs, the live database is copied to `<db>.prev`. When the
//! batch fails, the broken state is copied to `<db>.fail` for inspection and
//! `<db>.prev` is copied back onto the live file. Both recovery steps are
//! always attempted; their failures are collected, never raised over the
//! migration failure that triggered them.

use std::fmt;
use std::path::{Path, PathBuf};

use exodus_core::SnapshotPaths;
use tracing::{error, info};

use crate::database::backup;
use crate::error::Result;

/// Outcome of the two best-effort recovery steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// The broken state was saved to the failure slot.
    pub failure_saved: bool,
    /// The pre-batch snapshot was copied back onto the live database.
    pub restored: bool,
    /// Secondary diagnostics from recovery steps that failed.
    pub diagnostics: Vec<String>,
}

impl RecoveryReport {
    /// Both steps succeeded.
    pub fn is_complete(&self) -> bool {
        self.failure_saved && self.restored
    }
}

impl fmt::Display for RecoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_complete() {
            return f.write_str("database restored from pre-batch snapshot");
        }
        write!(f, "{}", self.diagnostics.join("; "))
    }
}

/// Owns the snapshot slots of one database file.
#[derive(Debug, Clone)]
pub struct SnapshotController {
    database: PathBuf,
    slots: SnapshotPaths,
}

impl SnapshotController {
    pub fn new(database: impl AsRef<Path>) -> Self {
        let database = database.as_ref().to_path_buf();
        let slots = SnapshotPaths::for_database(&database);
        Self { database, slots }
    }

    pub fn slots(&self) -> &SnapshotPaths {
        &self.slots
    }

    /// Copies the live database to the pre-batch slot, replacing the
    /// previous generation. A batch must not start if this fails.
    pub fn snapshot(&self) -> Result<()> {
        backup(&self.database, &self.slots.previous)?;
        info!(snapshot = %self.slots.previous.display(), "Saved pre-batch snapshot");
        Ok(())
    }

    /// Saves the live database to the failure slot, then restores the
    /// pre-batch slot onto it.
    ///
    /// The live database must not be held open by the caller.
    pub fn rollback(&self) -> RecoveryReport {
        let mut report = RecoveryReport::default();

        match backup(&self.database, &self.slots.failure) {
            Ok(()) => {
                report.failure_saved = true;
                info!(path = %self.slots.failure.display(), "Saved failed database state");
            }
            Err(err) => {
                error!(error = %err, "Can't save current state to fail database dump");
                report
                    .diagnostics
                    .push(format!("can't save failed state: {err}"));
            }
        }

        match backup(&self.slots.previous, &self.database) {
            Ok(()) => {
                report.restored = true;
                info!(database = %self.database.display(), "Restored pre-batch snapshot");
            }
            Err(err) => {
                error!(error = %err, "Can't restore database");
                report.diagnostics.push(format!("can't restore database: {err}"));
            }
        }

        report
    }
}

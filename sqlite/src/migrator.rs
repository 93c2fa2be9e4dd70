//! The `migrate` operation.
//!
//! Opens the database, reads the watermark, discovers pending files, takes
//! the pre-batch snapshot, then applies the pending files in order. Each
//! success is recorded before the next migration starts, so a crash leaves
//! the watermark at the last fully applied migration. The first failure stops
//! the batch and hands over to the [`SnapshotController`].
//!
//! # Example
//!
//! ```no_run
//! use exodus_sqlite::Migrator;
//!
//! let migrator = Migrator::new("app.db", "migrations");
//! let report = migrator.migrate().unwrap();
//! println!("applied {} migration(s)", report.applied.len());
//! ```

use std::path::{Path, PathBuf};

use exodus_core::{MigrationFile, ensure_runnable, pending_migrations};
use tracing::{error, info, warn};

use crate::apply::apply_migration;
use crate::catalog::Catalog;
use crate::database::Database;
use crate::error::{Result, SqliteError};
use crate::snapshot::SnapshotController;

/// Runs pending migrations against one database file.
#[derive(Debug, Clone)]
pub struct Migrator {
    database: PathBuf,
    migrations: PathBuf,
    init: Option<PathBuf>,
}

impl Migrator {
    pub fn new(database: impl Into<PathBuf>, migrations: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            migrations: migrations.into(),
            init: None,
        }
    }

    /// Sets the script executed on every connection this migrator opens.
    pub fn with_init(mut self, init: Option<PathBuf>) -> Self {
        self.init = init;
        self
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    /// Applies every pending migration.
    pub fn migrate(&self) -> Result<MigrationReport> {
        self.migrate_with(|_| {})
    }

    /// Applies every pending migration, calling `on_apply` right before each
    /// one starts.
    ///
    /// # Errors
    ///
    /// Configuration errors (unlistable directory, non-executable migration)
    /// and a failed snapshot abort before any migration runs. A failing
    /// migration yields [`SqliteError::BatchFailed`] after the rollback, with
    /// the rollback outcome attached.
    pub fn migrate_with<F>(&self, mut on_apply: F) -> Result<MigrationReport>
    where
        F: FnMut(&MigrationFile),
    {
        let db = self.open()?;
        let catalog = Catalog::new(&db);
        let watermark = catalog.watermark()?;
        let pending = pending_migrations(&self.migrations, watermark.as_deref())?;
        ensure_runnable(&pending)?;
        catalog.ensure()?;

        let controller = SnapshotController::new(&self.database);
        controller.snapshot()?;

        let mut applied = Vec::with_capacity(pending.len());
        let outcome = self.apply_batch(db, &pending, &mut applied, &mut on_apply);

        match outcome {
            Ok(db) => {
                // Every migration is recorded; a failing close is not a
                // migration failure.
                if let Err(err) = db.close() {
                    warn!(error = %err, "Can't close database after migration batch");
                }
                info!(count = applied.len(), "Migrations applied");
                Ok(MigrationReport {
                    previous_watermark: watermark,
                    applied,
                    snapshot: controller.slots().previous.clone(),
                })
            }
            Err((migration, source)) => {
                error!(migration = %migration, error = %source, "Migration failed, rolling back");
                // The connection was dropped when apply_batch returned.
                let recovery = controller.rollback();
                Err(SqliteError::BatchFailed {
                    migration,
                    source: Box::new(source),
                    recovery,
                })
            }
        }
    }

    /// Reads the watermark and pending list without applying anything.
    ///
    /// The database is opened read-only; a missing file reads as an empty
    /// catalog and is not created.
    pub fn status(&self) -> Result<MigrationStatus> {
        let (watermark, applied) = if self.database.exists() {
            let db = Database::open_read_only(&self.database)?;
            let catalog = Catalog::new(&db);
            let watermark = catalog.watermark()?;
            let applied = catalog.applied()?;
            db.close()?;
            (watermark, applied)
        } else {
            (None, Vec::new())
        };

        let pending = pending_migrations(&self.migrations, watermark.as_deref())?
            .into_iter()
            .map(|file| file.name)
            .collect();
        Ok(MigrationStatus {
            watermark,
            applied,
            pending,
        })
    }

    fn open(&self) -> Result<Database> {
        Database::open(&self.database, self.init.as_deref())
    }

    /// Applies `pending` in order and hands back the last connection. On
    /// failure the connection is dropped before returning. Errors carry the
    /// name of the failing migration.
    fn apply_batch<F>(
        &self,
        mut db: Database,
        pending: &[MigrationFile],
        applied: &mut Vec<String>,
        on_apply: &mut F,
    ) -> std::result::Result<Database, (String, SqliteError)>
    where
        F: FnMut(&MigrationFile),
    {
        for file in pending {
            let failed = |err| (file.name.clone(), err);

            on_apply(file);
            info!(migration = %file.name, "Applying migration");
            apply_migration(&db, file).map_err(failed)?;
            Catalog::new(&db).record(&file.name).map_err(failed)?;
            applied.push(file.name.clone());

            // Fresh connection per migration: the init script runs again and
            // pragmas changed by the migration do not carry over.
            db = db.reopen().map_err(failed)?;
        }

        Ok(db)
    }
}

/// What a successful `migrate` run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Watermark before the batch started.
    pub previous_watermark: Option<String>,
    /// Names applied and recorded, in order.
    pub applied: Vec<String>,
    /// Pre-batch snapshot location.
    pub snapshot: PathBuf,
}

/// Read-only view of the bookkeeping and the migrations directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub watermark: Option<String>,
    /// Recorded names in insertion order.
    pub applied: Vec<String>,
    /// Names that the next `migrate` would apply.
    pub pending: Vec<String>,
}

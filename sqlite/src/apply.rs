//! Applying a single migration.
//!
//! Scripts run as one statement batch on the open connection. Executables run
//! as a child process that receives the database path as its only argument
//! and inherits the environment; the parent blocks until it exits, with no
//! timeout.

use std::fs;
use std::path::Path;
use std::process::{Command, ExitStatus};

use exodus_core::{MigrationFile, MigrationKind};
use tracing::debug;

use crate::database::Database;
use crate::error::{Result, SqliteError};

/// Applies `file` against `db`, dispatching on its kind.
///
/// The caller is expected to have run
/// [`ensure_runnable`](exodus_core::ensure_runnable) over the batch.
pub fn apply_migration(db: &Database, file: &MigrationFile) -> Result<()> {
    match file.kind() {
        MigrationKind::Script => apply_script(db, file),
        MigrationKind::Executable => apply_executable(file, db.path()),
    }
}

fn apply_script(db: &Database, file: &MigrationFile) -> Result<()> {
    let sql = fs::read_to_string(&file.path).map_err(|source| SqliteError::ReadMigrationError {
        path: file.path.clone(),
        source,
    })?;
    debug!(migration = %file.name, bytes = sql.len(), "Executing SQL migration");
    db.connection()
        .execute_batch(&sql)
        .map_err(|source| SqliteError::ScriptFailed {
            path: file.path.clone(),
            source,
        })
}

fn apply_executable(file: &MigrationFile, database: &Path) -> Result<()> {
    debug!(migration = %file.name, "Running migration executable");
    let status = Command::new(&file.path)
        .arg(database)
        .status()
        .map_err(|source| SqliteError::SpawnError {
            path: file.path.clone(),
            source,
        })?;
    check_status(file, status)
}

fn check_status(file: &MigrationFile, status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(SqliteError::ExecutableFailed {
            path: file.path.clone(),
            code,
        }),
        None => Err(SqliteError::ExecutableKilled {
            path: file.path.clone(),
            signal: termination_signal(&status),
        }),
    }
}

#[cfg(unix)]
fn termination_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

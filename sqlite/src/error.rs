//! Error types for the migration engine and the schema generator.
//!
//! Covers the engine collaborator (open, execute, backup), migration content
//! failures, generator limits, and the batch wrapper that pairs the primary
//! failure with the outcome of the rollback.

use std::path::PathBuf;

use exodus_core::{CoreError, ObjectKind};
use thiserror::Error;

use crate::snapshot::RecoveryReport;

/// Errors that can occur while migrating or generating migrations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// The database file could not be opened or configured.
    #[error("can't open database '{path}': {source}")]
    OpenError {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The per-connection init script could not be read.
    #[error("can't read init script '{path}': {source}")]
    InitScriptError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Whole-database copy between two files failed.
    #[error("can't back up '{from}' to '{to}': {source}")]
    BackupError {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A migration file could not be read.
    #[error("can't read migration file '{path}': {source}")]
    ReadMigrationError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An SQL migration was rejected by the engine.
    #[error("could not execute migration '{path}': {source}")]
    ScriptFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A migration executable could not be started.
    #[error("can't run migration executable '{path}': {source}")]
    SpawnError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration executable exited with a non-zero status.
    #[error("migration executable returned non zero status ({code}): {path}")]
    ExecutableFailed { path: PathBuf, code: i32 },

    /// A migration executable was terminated by a signal.
    #[error("migration executable was killed{}: {path}", signal_suffix(.signal))]
    ExecutableKilled { path: PathBuf, signal: Option<i32> },

    /// Recreation was requested for a table missing from the catalog.
    #[error("no such table: {0}")]
    UnknownTable(String),

    /// A catalog entry name is too long to be handled.
    #[error("{kind} name exceeds maximum length authorized ({limit} bytes): {name}")]
    NameTooLong {
        kind: ObjectKind,
        name: String,
        limit: usize,
    },

    /// A catalog entry definition is larger than the per-object ceiling.
    #[error("{kind} '{name}' definition exceeds allowed size of {limit} bytes")]
    ObjectTooLarge {
        kind: ObjectKind,
        name: String,
        limit: usize,
    },

    /// The generated migration would be larger than the file ceiling.
    #[error("max migration file length exceeded ({limit} bytes)")]
    OutputTooLarge { limit: usize },

    /// A migration in the batch failed; the database was rolled back.
    #[error("can't apply migration {migration}: {source}")]
    BatchFailed {
        migration: String,
        #[source]
        source: Box<SqliteError>,
        recovery: RecoveryReport,
    },

    /// Discovery, validation or settings failure.
    #[error(transparent)]
    CoreError(#[from] CoreError),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

fn signal_suffix(signal: &Option<i32>) -> String {
    signal.map(|s| format!(" by signal {s}")).unwrap_or_default()
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;

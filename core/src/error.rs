//! Error types for migration discovery, validation and settings.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised before any database is touched.
///
/// All of these are configuration errors: they are fatal and reported to the
/// operator without attempting any state change.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The migrations directory could not be listed.
    #[error("can't scan migrations directory '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory entry name is not valid UTF-8 and cannot be ordered.
    #[error("migration file name is not valid UTF-8: {0}")]
    InvalidFileName(PathBuf),

    /// A migration without the script suffix lacks the executable bit.
    #[error("migration is not an executable and does not have .sql extension: {0}")]
    NotExecutable(PathBuf),

    /// The migrations path exists but is not a directory.
    #[error("migrations path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The human-provided migration label cannot be used in a file name.
    #[error("invalid migration name '{0}': must be non-empty, without path separators, and shorter than 200 bytes")]
    InvalidLabel(String),

    /// The table name given for recreation is empty or too long.
    #[error("invalid table name '{0}': must be non-empty and shorter than 200 bytes")]
    InvalidTableName(String),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML settings parsing failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias for results with [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

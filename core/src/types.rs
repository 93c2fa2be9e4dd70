//! Migration and schema object types shared by the engine and the generator.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// File name suffix that marks a migration as an SQL script.
pub const SCRIPT_SUFFIX: &str = ".sql";

/// Upper bound (exclusive) for migration labels, table and object names.
pub const MAX_NAME_LEN: usize = 200;

/// Upper bound for a single catalog entry definition (500 KB).
pub const MAX_OBJECT_LEN: usize = 5 * 1024 * 100;

/// Upper bound for a whole generated migration file (5 MB).
pub const MAX_FILE_LEN: usize = 5 * 1024 * 1024;

/// How a migration file is applied, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationKind {
    /// Text file executed as one statement batch on the open connection.
    Script,
    /// Child process invoked with the database path as its sole argument.
    Executable,
}

impl MigrationKind {
    /// Classifies a migration by name alone.
    ///
    /// ```
    /// use exodus_core::MigrationKind;
    ///
    /// assert_eq!(MigrationKind::from_name("001-init.sql"), MigrationKind::Script);
    /// assert_eq!(MigrationKind::from_name("002-backfill"), MigrationKind::Executable);
    /// ```
    pub fn from_name(name: &str) -> Self {
        if name.ends_with(SCRIPT_SUFFIX) {
            Self::Script
        } else {
            Self::Executable
        }
    }
}

/// A migration entry found in the migrations directory.
///
/// The engine never rewrites a migration file; it only reads or runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// Bare file name; this is what the catalog records.
    pub name: String,
    /// Full path (`<migrations-dir>/<name>`).
    pub path: PathBuf,
}

impl MigrationFile {
    pub fn new(dir: &Path, name: impl Into<String>) -> Self {
        let name = name.into();
        let path = dir.join(&name);
        Self { name, path }
    }

    pub fn kind(&self) -> MigrationKind {
        MigrationKind::from_name(&self.name)
    }
}

impl fmt::Display for MigrationFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Kind of entry in the engine's system catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    Trigger,
    View,
    Index,
}

impl ObjectKind {
    /// Value of the catalog's `type` column.
    pub fn catalog_type(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Trigger => "trigger",
            Self::View => "view",
            Self::Index => "index",
        }
    }

    /// Keyword used in `DROP <keyword> IF EXISTS`.
    pub fn sql_keyword(self) -> &'static str {
        match self {
            Self::Table => "TABLE",
            Self::Trigger => "TRIGGER",
            Self::View => "VIEW",
            Self::Index => "INDEX",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.catalog_type())
    }
}

/// A named object read from the system catalog at generation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaObject {
    pub name: String,
    /// Definition text exactly as stored in the catalog.
    pub sql: String,
    pub kind: ObjectKind,
}

/// On-disk locations of the two snapshot slots of a database file.
///
/// ```
/// use std::path::Path;
/// use exodus_core::SnapshotPaths;
///
/// let slots = SnapshotPaths::for_database(Path::new("data/app.db"));
/// assert_eq!(slots.previous, Path::new("data/app.db.prev"));
/// assert_eq!(slots.failure, Path::new("data/app.db.fail"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPaths {
    /// Pre-batch slot, overwritten at the start of every run.
    pub previous: PathBuf,
    /// Failure slot, written only when a batch fails.
    pub failure: PathBuf,
}

impl SnapshotPaths {
    pub fn for_database(database: &Path) -> Self {
        Self {
            previous: with_suffix(database, ".prev"),
            failure: with_suffix(database, ".fail"),
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = OsString::from(path.as_os_str());
    raw.push(suffix);
    PathBuf::from(raw)
}

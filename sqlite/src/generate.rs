//! The `generate` operation.
//!
//! Writes a new migration file named `<timestamp>-<label>.sql` into the
//! migrations directory. With a target table the file holds a recreation
//! script, otherwise a placeholder comment for hand-written SQL. The content
//! is fully built before anything touches the filesystem, so a failure writes
//! no file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use exodus_core::{CoreError, SCRIPT_SUFFIX, validate_label, validate_table_name};
use tracing::info;

use crate::database::Database;
use crate::error::Result;
use crate::recreate::recreate_table_script;

/// Content of a migration generated without a target table.
pub const RAW_PLACEHOLDER: &str = "-- Your SQL\n";

/// Builds migration files for one migrations directory.
///
/// # Examples
///
/// ```no_run
/// use exodus_sqlite::Generator;
///
/// let generator = Generator::new("migrations", "app.db");
/// let raw = generator.generate("add_notes", None).unwrap();
/// let rebuild = generator.generate("tighten_users", Some("users")).unwrap();
/// println!("{} {}", raw.display(), rebuild.display());
/// ```
#[derive(Debug, Clone)]
pub struct Generator {
    migrations: PathBuf,
    database: PathBuf,
    init: Option<PathBuf>,
}

impl Generator {
    pub fn new(migrations: impl Into<PathBuf>, database: impl Into<PathBuf>) -> Self {
        Self {
            migrations: migrations.into(),
            database: database.into(),
            init: None,
        }
    }

    /// Sets the script executed on the connection used in recreation mode.
    pub fn with_init(mut self, init: Option<PathBuf>) -> Self {
        self.init = init;
        self
    }

    /// Generates a migration stamped with the current Unix time.
    pub fn generate(&self, label: &str, recreate: Option<&str>) -> Result<PathBuf> {
        self.generate_at(label, recreate, chrono::Utc::now().timestamp())
    }

    /// Generates a migration stamped with `timestamp`.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error for an invalid label or table name or
    /// a migrations path that is not a directory, with
    /// [`SqliteError::UnknownTable`](crate::SqliteError::UnknownTable) or a
    /// size error from the recreation generator, or with an I/O error if the
    /// file already exists or cannot be written.
    pub fn generate_at(&self, label: &str, recreate: Option<&str>, timestamp: i64) -> Result<PathBuf> {
        validate_label(label)?;
        let content = match recreate {
            Some(table) => self.recreation_content(table)?,
            None => RAW_PLACEHOLDER.to_string(),
        };

        ensure_directory(&self.migrations)?;
        let path = migration_filename(&self.migrations, timestamp, label);
        save_migration(&path, &content)?;
        info!(path = %path.display(), recreate = ?recreate, "Migration created");
        Ok(path)
    }

    fn recreation_content(&self, table: &str) -> Result<String> {
        validate_table_name(table)?;
        let db = Database::open(&self.database, self.init.as_deref())?;
        let script = recreate_table_script(&db, table)?;
        db.close()?;
        Ok(script)
    }
}

/// `<dir>/<timestamp>-<label>.sql`
///
/// ```
/// use std::path::Path;
/// use exodus_sqlite::migration_filename;
///
/// let path = migration_filename(Path::new("migrations"), 1700000000, "add_users");
/// assert_eq!(path, Path::new("migrations/1700000000-add_users.sql"));
/// ```
pub fn migration_filename(dir: &Path, timestamp: i64, label: &str) -> PathBuf {
    dir.join(format!("{timestamp}-{label}{SCRIPT_SUFFIX}"))
}

fn ensure_directory(dir: &Path) -> Result<()> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(CoreError::NotADirectory(dir.to_path_buf()).into());
        }
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Writes a new file; an existing file is never overwritten.
fn save_migration(path: &Path, content: &str) -> Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

//! The database engine collaborator.
//!
//! [`Database`] owns one live connection and is passed explicitly to every
//! component that needs it. [`backup`] copies a whole database file onto
//! another through SQLite's online backup API.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::backup::Backup;
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::{Result, SqliteError};

/// How long a connection waits on a locked database before failing.
pub const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Pages copied per backup step; large enough to copy any file in one step.
const BACKUP_PAGES_PER_STEP: i32 = i32::MAX;

/// Pragmas applied to every connection after `journal_mode`.
const CONNECTION_DEFAULTS: &str = "
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;
PRAGMA temp_store = MEMORY;
";

/// An open connection to the live database.
///
/// The connection is closed when the value is dropped, on every exit path.
///
/// # Examples
///
/// ```no_run
/// use exodus_sqlite::Database;
///
/// let db = Database::open("app.db", None).unwrap();
/// db.execute("CREATE TABLE IF NOT EXISTS notes (body TEXT)").unwrap();
/// db.close().unwrap();
/// ```
#[derive(Debug)]
pub struct Database {
    conn: Connection,
    path: PathBuf,
    init: Option<PathBuf>,
}

impl Database {
    /// Opens (creating if needed) the database file and configures the
    /// connection: busy timeout, WAL journal, connection defaults, then the
    /// init script when one is given.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::OpenError`] if the file cannot be opened or a
    /// default cannot be applied, [`SqliteError::InitScriptError`] if the init
    /// script cannot be read, and [`SqliteError::DatabaseError`] if it fails.
    pub fn open(path: impl AsRef<Path>, init: Option<&Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let open_error = |source| SqliteError::OpenError {
            path: path.clone(),
            source,
        };

        let conn = Connection::open(&path).map_err(open_error)?;
        configure(&conn).map_err(open_error)?;

        let db = Self {
            conn,
            path,
            init: init.map(Path::to_path_buf),
        };
        db.run_init_script()?;
        debug!(path = %db.path.display(), "Opened database");
        Ok(db)
    }

    /// Opens an existing database file read-only, without the connection
    /// defaults or the init script. The file is never created or converted
    /// to WAL.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let open_error = |source| SqliteError::OpenError {
            path: path.clone(),
            source,
        };

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(open_error)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(open_error)?;
        debug!(path = %path.display(), "Opened database read-only");
        Ok(Self {
            conn,
            path,
            init: None,
        })
    }

    /// Opens a private in-memory database with the connection defaults.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
            init: None,
        })
    }

    /// Executes a batch of statements without bound parameters, discarding
    /// any result rows.
    pub fn execute(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Closes the connection and opens a fresh one on the same file, running
    /// the init script again.
    pub fn reopen(self) -> Result<Self> {
        let path = self.path.clone();
        let init = self.init.clone();
        self.close()?;
        Self::open(path, init.as_deref())
    }

    /// Closes the connection, reporting any error the engine raises.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| SqliteError::DatabaseError(err))
    }

    /// Path the connection was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn run_init_script(&self) -> Result<()> {
        let Some(init) = self.init.as_deref() else {
            return Ok(());
        };
        let sql = fs::read_to_string(init).map_err(|source| SqliteError::InitScriptError {
            path: init.to_path_buf(),
            source,
        })?;
        debug!(init = %init.display(), "Running init script");
        self.execute(&sql)
    }
}

fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    // journal_mode reports the resulting mode as a row.
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.execute_batch(CONNECTION_DEFAULTS)
}

/// Copies the whole database at `from` onto `to`.
///
/// The source must already exist; the destination is created or replaced.
/// Both connections are released before returning.
///
/// # Errors
///
/// Returns [`SqliteError::BackupError`] if either file is unreachable or the
/// copy fails part way.
pub fn backup(from: &Path, to: &Path) -> Result<()> {
    let backup_error = |source: rusqlite::Error| SqliteError::BackupError {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    let src = Connection::open_with_flags(
        from,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(backup_error)?;
    src.busy_timeout(BUSY_TIMEOUT).map_err(backup_error)?;

    let mut dst = Connection::open(to).map_err(backup_error)?;
    dst.busy_timeout(BUSY_TIMEOUT).map_err(backup_error)?;

    {
        let run = Backup::new(&src, &mut dst).map_err(backup_error)?;
        run.run_to_completion(BACKUP_PAGES_PER_STEP, Duration::ZERO, None)
            .map_err(backup_error)?;
    }

    debug!(from = %from.display(), to = %to.display(), "Backup complete");
    Ok(())
}

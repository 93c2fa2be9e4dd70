//! Migration discovery.
//!
//! Lists the migrations directory and keeps the entries that sort strictly
//! after the watermark, the lexically greatest name recorded as applied.
//!
//! "Applied" is not set membership: a file whose name sorts before the
//! watermark is treated as applied even if it never ran. Adding a migration
//! with an out-of-order name therefore skips it silently. Existing migration
//! histories depend on this, so it is kept as is.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{CoreError, Result};
use crate::types::{MigrationFile, MigrationKind};

/// Returns the pending migrations of `dir`, sorted ascending by name.
///
/// Entries starting with `.` are ignored. With no watermark every entry is
/// pending. An empty directory, or a watermark above every entry, yields an
/// empty list.
///
/// # Errors
///
/// Returns [`CoreError::ReadDir`] if the directory cannot be listed and
/// [`CoreError::InvalidFileName`] for a pending name that is not valid UTF-8.
/// Hidden entries and entries at or below the watermark are skipped on their
/// raw bytes, whatever their encoding.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use exodus_core::pending_migrations;
///
/// let pending = pending_migrations(Path::new("migrations"), Some("1700000000-init.sql")).unwrap();
/// for file in &pending {
///     println!("{}", file.name);
/// }
/// ```
pub fn pending_migrations(dir: &Path, watermark: Option<&str>) -> Result<Vec<MigrationFile>> {
    let read_dir = |source| CoreError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut pending = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir)? {
        let entry = entry.map_err(read_dir)?;
        let raw = entry.file_name();
        let skip = {
            let bytes = name_bytes(&raw);
            bytes.starts_with(b".") || !bytes_after_watermark(&bytes, watermark)
        };
        if skip {
            continue;
        }
        let name = raw
            .into_string()
            .map_err(|_| CoreError::InvalidFileName(entry.path()))?;
        pending.push(MigrationFile::new(dir, name));
    }

    pending.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
    debug!(dir = %dir.display(), count = pending.len(), "Found pending migrations");
    Ok(pending)
}

/// Byte-wise comparison against the watermark.
pub fn is_after_watermark(name: &str, watermark: Option<&str>) -> bool {
    bytes_after_watermark(name.as_bytes(), watermark)
}

fn bytes_after_watermark(name: &[u8], watermark: Option<&str>) -> bool {
    match watermark {
        Some(mark) => name > mark.as_bytes(),
        None => true,
    }
}

#[cfg(unix)]
fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(name.as_bytes())
}

#[cfg(not(unix))]
fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    match name.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

/// Checks that every non-script migration carries the executable bit.
///
/// Run over the whole pending list before the batch starts, so that a
/// misnamed file fails the run before any database mutation.
///
/// # Errors
///
/// Returns [`CoreError::NotExecutable`] for the first offending file.
pub fn ensure_runnable(files: &[MigrationFile]) -> Result<()> {
    for file in files {
        if file.kind() == MigrationKind::Executable && !is_executable(&file.path) {
            return Err(CoreError::NotExecutable(file.path.clone()));
        }
    }
    Ok(())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o100 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

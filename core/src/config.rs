//! Tool settings.
//!
//! Settings come from three layers, lowest precedence first: built-in
//! defaults, an optional YAML file, and command-line flags applied by the
//! caller.
//!
//! # Example YAML
//!
//! ```yaml
//! database: ./var/app.db
//! migrations: ./db/migrations
//! structure: ./db/structure.sql
//! init: ./db/init.sql
//! ```

use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

/// File name of the per-connection initialization script looked up in the
/// standard configuration directories.
pub const INIT_FILE_NAME: &str = "exodus-init.sql";

/// Default settings file read from the working directory when present.
pub const DEFAULT_SETTINGS_FILE: &str = "exodus.yml";

/// Paths the migration engine and generator operate on.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use exodus_core::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(settings.database, Path::new("./app.db"));
/// assert_eq!(settings.migrations, Path::new("./migrations"));
/// assert!(settings.init.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Live database file.
    pub database: PathBuf,
    /// Directory holding migration files.
    pub migrations: PathBuf,
    /// Structure dump written after a successful migration run.
    pub structure: PathBuf,
    /// SQL executed on every connection right after it is opened.
    pub init: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("./app.db"),
            migrations: PathBuf::from("./migrations"),
            structure: PathBuf::from("./structure.sql"),
            init: None,
        }
    }
}

impl Settings {
    /// Loads settings from a YAML file; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::CoreError::Io) if the file cannot be read, or
    /// [`Yaml`](crate::CoreError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let settings = serde_yaml::from_reader(reader)?;
        Ok(settings)
    }
}

/// Finds the per-connection initialization script.
///
/// An explicit path wins when given, whether or not it exists (opening it
/// reports the problem). Otherwise the first existing file among
/// `$XDG_CONFIG_HOME/exodus-init.sql`, `$HOME/.config/exodus-init.sql` and
/// `/etc/exodus-init.sql` is used. `env` resolves environment variables.
pub fn find_init_file<F>(explicit: Option<&Path>, env: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let mut candidates = Vec::new();
    if let Some(xdg) = env("XDG_CONFIG_HOME") {
        candidates.push(Path::new(&xdg).join(INIT_FILE_NAME));
    }
    if let Some(home) = env("HOME") {
        candidates.push(Path::new(&home).join(".config").join(INIT_FILE_NAME));
    }
    candidates.push(Path::new("/etc").join(INIT_FILE_NAME));

    candidates.into_iter().find(|path| path.exists())
}

//! Persistent bookkeeping of applied migrations.
//!
//! One table, `migrations(name TEXT NOT NULL)`, append-only. What counts as
//! applied is defined by its lexical maximum alone (the watermark), never by
//! per-name membership. A migration added later with a name that sorts below
//! the watermark is therefore never applied.

use rusqlite::OptionalExtension;
use tracing::debug;

use crate::database::Database;
use crate::error::Result;

/// Name of the bookkeeping table in the target database.
pub const CATALOG_TABLE: &str = "migrations";

/// Read/append access to the bookkeeping table over a borrowed connection.
pub struct Catalog<'a> {
    db: &'a Database,
}

impl<'a> Catalog<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Creates the bookkeeping table if it does not exist yet.
    pub fn ensure(&self) -> Result<()> {
        self.db.execute(&format!(
            "CREATE TABLE IF NOT EXISTS {CATALOG_TABLE}(name TEXT NOT NULL)"
        ))
    }

    /// Checks whether the bookkeeping table exists.
    pub fn exists(&self) -> Result<bool> {
        let count: i64 = self.db.connection().query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [CATALOG_TABLE],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Returns the most recently applied migration name: the greatest name
    /// recorded, compared byte-wise. `None` when nothing was recorded or the
    /// table does not exist yet; this never creates the table.
    pub fn watermark(&self) -> Result<Option<String>> {
        if !self.exists()? {
            return Ok(None);
        }
        let name = self
            .db
            .connection()
            .query_row(
                &format!("SELECT name FROM {CATALOG_TABLE} ORDER BY name DESC LIMIT 1"),
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    /// Records `name` as applied.
    ///
    /// Duplicates are not checked; the statement completes before this
    /// returns so the record is durable before the next migration starts.
    pub fn record(&self, name: &str) -> Result<()> {
        self.db.connection().execute(
            &format!("INSERT INTO {CATALOG_TABLE}(name) VALUES (?1)"),
            [name],
        )?;
        debug!(migration = %name, "Recorded migration");
        Ok(())
    }

    /// Lists every recorded name in insertion order.
    pub fn applied(&self) -> Result<Vec<String>> {
        if !self.exists()? {
            return Ok(Vec::new());
        }
        let mut stmt = self
            .db
            .connection()
            .prepare(&format!("SELECT name FROM {CATALOG_TABLE} ORDER BY rowid"))?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watermark_on_fresh_database_does_not_create_table() {
        let db = Database::open_in_memory().unwrap();
        let catalog = Catalog::new(&db);
        assert_eq!(catalog.watermark().unwrap(), None);
        assert!(!catalog.exists().unwrap());
        assert!(catalog.applied().unwrap().is_empty());
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let catalog = Catalog::new(&db);
        catalog.ensure().unwrap();
        catalog.ensure().unwrap();
        assert!(catalog.exists().unwrap());
        assert_eq!(catalog.watermark().unwrap(), None);
    }

    #[test]
    fn test_watermark_is_lexical_maximum_not_last_insert() {
        let db = Database::open_in_memory().unwrap();
        let catalog = Catalog::new(&db);
        catalog.ensure().unwrap();
        catalog.record("002-b.sql").unwrap();
        catalog.record("010-j.sql").unwrap();
        catalog.record("001-a.sql").unwrap();

        assert_eq!(catalog.watermark().unwrap().as_deref(), Some("010-j.sql"));
        assert_eq!(
            catalog.applied().unwrap(),
            vec!["002-b.sql", "010-j.sql", "001-a.sql"]
        );
    }

    #[test]
    fn test_record_accepts_duplicates() {
        let db = Database::open_in_memory().unwrap();
        let catalog = Catalog::new(&db);
        catalog.ensure().unwrap();
        catalog.record("001-a.sql").unwrap();
        catalog.record("001-a.sql").unwrap();
        assert_eq!(catalog.applied().unwrap().len(), 2);
    }

    #[test]
    fn test_record_without_table_fails() {
        let db = Database::open_in_memory().unwrap();
        assert!(Catalog::new(&db).record("001-a.sql").is_err());
    }
}

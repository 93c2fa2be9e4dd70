//! Structure dump written after a successful migration run.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::database::Database;
use crate::error::Result;

const STRUCTURE_QUERY: &str = r"
SELECT sql FROM sqlite_master
WHERE sql IS NOT NULL AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
ORDER BY CASE type WHEN 'table' THEN 0 WHEN 'index' THEN 1 WHEN 'view' THEN 2 ELSE 3 END, name
";

/// Returns every user-defined schema statement: tables, indexes, views then
/// triggers, each sorted by name and terminated by `;` and a blank line.
pub fn dump_structure(db: &Database) -> Result<String> {
    let mut stmt = db.connection().prepare(STRUCTURE_QUERY)?;
    let statements = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut out = String::new();
    for sql in &statements {
        out.push_str(sql);
        out.push_str(";\n\n");
    }
    Ok(out)
}

/// Writes [`dump_structure`] to `path`, replacing any previous dump.
pub fn write_structure(db: &Database, path: &Path) -> Result<()> {
    let dump = dump_structure(db)?;
    fs::write(path, &dump)?;
    debug!(path = %path.display(), bytes = dump.len(), "Wrote structure dump");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_orders_by_kind_then_name() {
        let db = Database::open_in_memory().unwrap();
        db.execute(
            "CREATE TABLE b (x INTEGER PRIMARY KEY AUTOINCREMENT);
             CREATE TABLE a (y TEXT UNIQUE);
             CREATE VIEW v AS SELECT * FROM b;
             CREATE INDEX b_x ON b(x);",
        )
        .unwrap();

        let dump = dump_structure(&db).unwrap();
        assert_eq!(
            dump,
            "CREATE TABLE a (y TEXT UNIQUE);\n\n\
             CREATE TABLE b (x INTEGER PRIMARY KEY AUTOINCREMENT);\n\n\
             CREATE INDEX b_x ON b(x);\n\n\
             CREATE VIEW v AS SELECT * FROM b;\n\n"
        );
    }

    #[test]
    fn test_empty_database_dumps_nothing() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(dump_structure(&db).unwrap(), "");
    }
}

//! Table recreation scripts.
//!
//! SQLite cannot alter some constraints (`CHECK`, foreign keys, ...) in
//! place, so changing them means rebuilding the table. The generated script:
//!
//! 1. disables foreign key enforcement and enables legacy rename semantics,
//!    so renaming the table does not rewrite references in other tables;
//! 2. drops every trigger, view and index found to depend on the table;
//! 3. renames the table to `<table>_old`, recreates it from its original
//!    definition, copies the rows over in rowid order and drops the old one;
//! 4. recreates the dropped triggers, views and indexes verbatim.
//!
//! The operator edits the `CREATE TABLE` statement of step 3 before running
//! the migration.
//!
//! Dependents are found by [`TextualMatch`], a heuristic over the catalog's
//! SQL text rather than a parse. It can report false positives (the name
//! inside another identifier or a string literal) and miss references
//! formatted differently. Switching to a real parser would change which
//! objects are dropped and recreated.

use exodus_core::{MAX_FILE_LEN, MAX_NAME_LEN, MAX_OBJECT_LEN, ObjectKind, SchemaObject};
use rusqlite::OptionalExtension;
use tracing::debug;

use crate::database::Database;
use crate::error::{Result, SqliteError};

/// Directives emitted before anything else.
pub const RECREATE_PRAGMAS: &str = "PRAGMA foreign_keys = OFF;\nPRAGMA legacy_alter_table = ON;\n";

/// Heuristic dependency match: the table name as a separated token.
///
/// Three fixed `LIKE` patterns approximate a word boundary: the name
/// surrounded by spaces, directly followed by `(`, or followed by a line
/// break, always preceded by a space. `LIKE` is ASCII case-insensitive and
/// `_` or `%` inside the name act as wildcards. The pattern set is fixed for
/// compatibility with existing generated migrations.
#[derive(Debug, Clone, Copy)]
pub struct TextualMatch<'a> {
    table: &'a str,
}

impl<'a> TextualMatch<'a> {
    pub fn new(table: &'a str) -> Self {
        Self { table }
    }

    /// The `LIKE` patterns, any one of which marks an entry as dependent.
    ///
    /// ```
    /// use exodus_sqlite::TextualMatch;
    ///
    /// let patterns = TextualMatch::new("users").like_patterns();
    /// assert_eq!(patterns, ["% users %", "% users(%", "% users\n%"]);
    /// ```
    pub fn like_patterns(&self) -> [String; 3] {
        let table = self.table;
        [
            format!("% {table} %"),
            format!("% {table}(%"),
            format!("% {table}\n%"),
        ]
    }
}

/// Everything needed to rebuild one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecreation {
    pub table: SchemaObject,
    pub triggers: Vec<SchemaObject>,
    pub views: Vec<SchemaObject>,
    pub indexes: Vec<SchemaObject>,
}

impl TableRecreation {
    /// Locates `table` in the catalog and discovers its dependents.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::UnknownTable`] when no table has that exact
    /// name, and [`SqliteError::ObjectTooLarge`] or
    /// [`SqliteError::NameTooLong`] for entries over the size ceilings.
    pub fn discover(db: &Database, table: &str) -> Result<Self> {
        let table = locate_table(db, table)?;
        let matcher = TextualMatch::new(&table.name);
        let triggers = find_dependents(db, ObjectKind::Trigger, matcher)?;
        let views = find_dependents(db, ObjectKind::View, matcher)?;
        let indexes = find_dependents(db, ObjectKind::Index, matcher)?;

        debug!(
            table = %table.name,
            triggers = triggers.len(),
            views = views.len(),
            indexes = indexes.len(),
            "Discovered table dependents"
        );
        Ok(Self {
            table,
            triggers,
            views,
            indexes,
        })
    }

    /// Dependents in emission order: triggers, then views, then indexes.
    pub fn dependents(&self) -> impl Iterator<Item = &SchemaObject> {
        self.triggers
            .iter()
            .chain(self.views.iter())
            .chain(self.indexes.iter())
    }

    /// Renders the migration script.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::ObjectTooLarge`] if a single statement exceeds
    /// [`MAX_OBJECT_LEN`], or [`SqliteError::OutputTooLarge`] if the script
    /// exceeds [`MAX_FILE_LEN`]. Nothing is truncated.
    pub fn render(&self) -> Result<String> {
        let mut script = ScriptBuffer::new(MAX_FILE_LEN);
        script.push(RECREATE_PRAGMAS)?;

        for object in self.dependents() {
            let statement = format!(
                "DROP {} IF EXISTS {};\n",
                object.kind.sql_keyword(),
                object.name
            );
            script.push(&bounded(statement, object)?)?;
        }

        script.push(&bounded(rotation(&self.table), &self.table)?)?;

        for object in self.dependents() {
            script.push(&bounded(format!("{};\n\n", object.sql), object)?)?;
        }

        Ok(script.into_string())
    }
}

/// Discovers dependents of `table` and renders its recreation script.
pub fn recreate_table_script(db: &Database, table: &str) -> Result<String> {
    TableRecreation::discover(db, table)?.render()
}

/// Rename, recreate, copy, drop.
fn rotation(table: &SchemaObject) -> String {
    let name = &table.name;
    format!(
        "\nALTER TABLE {name} RENAME TO {name}_old;\n\n{sql};\n\nINSERT INTO {name} SELECT * FROM {name}_old ORDER BY rowid;\nDROP TABLE {name}_old;\n\n",
        sql = table.sql
    )
}

fn bounded(statement: String, object: &SchemaObject) -> Result<String> {
    if statement.len() > MAX_OBJECT_LEN {
        return Err(SqliteError::ObjectTooLarge {
            kind: object.kind,
            name: object.name.clone(),
            limit: MAX_OBJECT_LEN,
        });
    }
    Ok(statement)
}

fn locate_table(db: &Database, table: &str) -> Result<SchemaObject> {
    let row: Option<(String, Option<String>)> = db
        .connection()
        .query_row(
            "SELECT name, sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        Some((name, Some(sql))) => checked_object(ObjectKind::Table, name, sql),
        _ => Err(SqliteError::UnknownTable(table.to_string())),
    }
}

fn find_dependents(
    db: &Database,
    kind: ObjectKind,
    matcher: TextualMatch<'_>,
) -> Result<Vec<SchemaObject>> {
    let [first, second, third] = matcher.like_patterns();
    let mut stmt = db.connection().prepare(
        "SELECT name, sql FROM sqlite_master \
         WHERE type = ?1 AND (sql LIKE ?2 OR sql LIKE ?3 OR sql LIKE ?4) \
         ORDER BY rowid",
    )?;
    let rows = stmt.query_map(
        [kind.catalog_type(), first.as_str(), second.as_str(), third.as_str()],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
    )?;

    let mut objects = Vec::new();
    for row in rows {
        let (name, sql) = row?;
        objects.push(checked_object(kind, name, sql)?);
    }
    Ok(objects)
}

fn checked_object(kind: ObjectKind, name: String, sql: String) -> Result<SchemaObject> {
    if name.len() > MAX_NAME_LEN - 1 {
        return Err(SqliteError::NameTooLong {
            kind,
            name,
            limit: MAX_NAME_LEN,
        });
    }
    if sql.len() > MAX_OBJECT_LEN - 1 {
        return Err(SqliteError::ObjectTooLarge {
            kind,
            name,
            limit: MAX_OBJECT_LEN,
        });
    }
    Ok(SchemaObject { name, sql, kind })
}

/// Output buffer with a hard size ceiling.
#[derive(Debug)]
pub(crate) struct ScriptBuffer {
    content: String,
    limit: usize,
}

impl ScriptBuffer {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            content: String::new(),
            limit,
        }
    }

    pub(crate) fn push(&mut self, adding: &str) -> Result<()> {
        if self.content.len() + adding.len() > self.limit - 1 {
            return Err(SqliteError::OutputTooLarge { limit: self.limit });
        }
        self.content.push_str(adding);
        Ok(())
    }

    pub(crate) fn into_string(self) -> String {
        self.content
    }
}

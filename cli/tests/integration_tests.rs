use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

use rusqlite::Connection;
use tempfile::TempDir;

/// Runs the binary inside `dir` with an isolated configuration environment.
fn exodus(dir: &Path, args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_exodus"))
        .args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env_remove("EXODUS_LOG")
        .output()
        .expect("failed to run exodus")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn watermark(db: &Path) -> Option<String> {
    let conn = Connection::open(db).unwrap();
    conn.query_row(
        "SELECT name FROM migrations ORDER BY name DESC LIMIT 1",
        [],
        |row| row.get(0),
    )
    .ok()
}

fn created_path(output: &Output) -> PathBuf {
    let out = stdout(output);
    let line = out
        .lines()
        .find_map(|line| line.strip_prefix("Migration created in "))
        .unwrap_or_else(|| panic!("no creation line in: {out}"));
    PathBuf::from(line.trim())
}

#[test]
fn test_generate_then_migrate_round_trip() {
    let dir = TempDir::new().unwrap();

    let output = exodus(dir.path(), &["generate", "first"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let relative = created_path(&output);
    let generated = dir.path().join(&relative);
    assert_eq!(fs::read_to_string(&generated).unwrap(), "-- Your SQL\n");

    fs::write(&generated, "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT);\n").unwrap();
    let output = exodus(dir.path(), &["migrate"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Applying migration"));

    let name = generated.file_name().unwrap().to_str().unwrap().to_string();
    assert_eq!(watermark(&dir.path().join("app.db")), Some(name));
    assert!(dir.path().join("app.db.prev").exists());

    let structure = fs::read_to_string(dir.path().join("structure.sql")).unwrap();
    assert!(structure.contains("CREATE TABLE notes"));
    assert!(structure.contains("migrations"));
}

#[test]
fn test_settings_file_and_flags() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("exodus.yml"),
        "database: data.db\nmigrations: db/migrations\n",
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("db/migrations")).unwrap();
    fs::write(
        dir.path().join("db/migrations/001-a.sql"),
        "CREATE TABLE a (x INTEGER);",
    )
    .unwrap();

    let output = exodus(dir.path(), &["migrate", "--structure", "schema.sql"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        watermark(&dir.path().join("data.db")).as_deref(),
        Some("001-a.sql")
    );
    assert!(dir.path().join("schema.sql").exists());
    assert!(!dir.path().join("app.db").exists());
}

#[test]
fn test_recreate_unknown_table_fails_without_file() {
    let dir = TempDir::new().unwrap();
    Connection::open(dir.path().join("app.db"))
        .unwrap()
        .execute_batch("CREATE TABLE users (id INTEGER);")
        .unwrap();

    let output = exodus(dir.path(), &["generate", "rebuild", "--recreate", "ghost"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("error:"));
    assert!(!dir.path().join("migrations").exists());
}

#[test]
fn test_recreate_known_table() {
    let dir = TempDir::new().unwrap();
    Connection::open(dir.path().join("app.db"))
        .unwrap()
        .execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT);
             CREATE INDEX users_email ON users (email);",
        )
        .unwrap();

    let output = exodus(dir.path(), &["generate", "rebuild_users", "--recreate", "users"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let script = fs::read_to_string(dir.path().join(created_path(&output))).unwrap();
    assert!(script.starts_with("PRAGMA foreign_keys = OFF;\nPRAGMA legacy_alter_table = ON;\n"));
    assert!(script.contains("DROP INDEX IF EXISTS users_email;"));
    assert!(script.contains("ALTER TABLE users RENAME TO users_old;"));
}

#[cfg(unix)]
#[test]
fn test_non_executable_migration_fails_before_mutation() {
    let dir = TempDir::new().unwrap();
    let migrations = dir.path().join("migrations");
    fs::create_dir(&migrations).unwrap();
    fs::write(migrations.join("001-a.sql"), "CREATE TABLE a (x INTEGER);").unwrap();
    fs::write(migrations.join("002-x"), "echo hi").unwrap();

    let output = exodus(dir.path(), &["migrate"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("not an executable"), "stderr: {}", stderr(&output));
    assert!(!stdout(&output).contains("Applying migration"));
    assert_eq!(watermark(&dir.path().join("app.db")), None);
    assert!(!dir.path().join("structure.sql").exists());
}

#[test]
fn test_failed_migration_exits_nonzero_and_restores() {
    let dir = TempDir::new().unwrap();
    let migrations = dir.path().join("migrations");
    fs::create_dir(&migrations).unwrap();
    fs::write(migrations.join("001-a.sql"), "CREATE TABLE a (x INTEGER);").unwrap();
    fs::write(migrations.join("002-bad.sql"), "THIS IS NOT SQL;").unwrap();

    let output = exodus(dir.path(), &["migrate"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("002-bad.sql"), "stderr: {err}");
    assert!(err.contains("restored"), "stderr: {err}");

    let db = dir.path().join("app.db");
    assert_eq!(watermark(&db), None);
    assert_eq!(
        watermark(&dir.path().join("app.db.fail")).as_deref(),
        Some("001-a.sql")
    );
}

#[test]
fn test_status_reports_pending() {
    let dir = TempDir::new().unwrap();
    let migrations = dir.path().join("migrations");
    fs::create_dir(&migrations).unwrap();
    fs::write(migrations.join("001-a.sql"), "CREATE TABLE a (x INTEGER);").unwrap();

    let output = exodus(dir.path(), &["status"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Watermark: (none)"));
    assert!(out.contains("  001-a.sql"));

    assert!(exodus(dir.path(), &["migrate"]).status.success());
    let out = stdout(&exodus(dir.path(), &["status"]));
    assert!(out.contains("Watermark: 001-a.sql"));
    assert!(out.contains("Pending: 0"));
}

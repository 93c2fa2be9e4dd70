//! SQLite migration engine.
//!
//! Applies versioned migrations to an SQLite database file so that a batch
//! either lands completely or the file is restored to its pre-batch state,
//! and generates migrations that rebuild a table together with its
//! triggers, views and indexes.
//!
//! # Architecture
//!
//! - **`database`**: the engine collaborator: connection setup, statement
//!   batches, whole-file backup
//! - **`catalog`**: the `migrations` bookkeeping table and its watermark
//! - **`apply`**: running one SQL script or executable migration
//! - **`snapshot`**: pre-batch snapshot and failure rollback
//! - **`migrator`**: the `migrate` operation tying the above together
//! - **`recreate`**: dependency discovery and the table rebuild script
//! - **`generate`**: the `generate` operation writing new migration files
//! - **`structure`**: schema dump after a successful run
//!
//! # Quick start
//!
//! ```no_run
//! use exodus_sqlite::{Generator, Migrator};
//!
//! let path = Generator::new("migrations", "app.db")
//!     .generate("create_notes", None)
//!     .unwrap();
//! println!("edit {} then run migrate", path.display());
//!
//! let report = Migrator::new("app.db", "migrations").migrate().unwrap();
//! for name in &report.applied {
//!     println!("applied {name}");
//! }
//! ```

mod apply;
mod catalog;
mod database;
mod error;
mod generate;
mod migrator;
mod recreate;
mod snapshot;
mod structure;

pub use apply::apply_migration;
pub use catalog::{CATALOG_TABLE, Catalog};
pub use database::{BUSY_TIMEOUT, Database, backup};
pub use error::{Result, SqliteError};
pub use generate::{Generator, RAW_PLACEHOLDER, migration_filename};
pub use migrator::{MigrationReport, MigrationStatus, Migrator};
pub use recreate::{RECREATE_PRAGMAS, TableRecreation, TextualMatch, recreate_table_script};
pub use snapshot::{RecoveryReport, SnapshotController};
pub use structure::{dump_structure, write_structure};

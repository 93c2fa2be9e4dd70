//! Engine-independent building blocks of the exodus migration tool.
//!
//! - [`pending_migrations`] lists the migrations directory and keeps the
//!   entries after the watermark, sorted by name.
//! - [`ensure_runnable`] rejects non-script migrations without the
//!   executable bit before a batch starts.
//! - [`MigrationFile`], [`MigrationKind`], [`SchemaObject`] and
//!   [`SnapshotPaths`] describe what the engine works on.
//! - [`Settings`] and [`find_init_file`] resolve the paths the tool uses.
//!
//! # Example
//!
//! ```no_run
//! use exodus_core::{Settings, ensure_runnable, pending_migrations};
//!
//! let settings = Settings::default();
//! let pending = pending_migrations(&settings.migrations, None).unwrap();
//! ensure_runnable(&pending).unwrap();
//! ```

pub mod config;
mod discover;
mod error;
mod types;
mod validate;

pub use config::{Settings, find_init_file};
pub use discover::{ensure_runnable, is_after_watermark, pending_migrations};
pub use error::{CoreError, Result};
pub use types::*;
pub use validate::{validate_label, validate_table_name};

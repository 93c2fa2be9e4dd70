use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use exodus_core::Settings;
use exodus_core::config::{DEFAULT_SETTINGS_FILE, find_init_file};
use exodus_sqlite::{Database, Generator, Migrator, SqliteError, write_structure};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
const LOG_ENV: &str = "EXODUS_LOG";

#[derive(Debug, Parser)]
#[command(name = "exodus", version)]
#[command(about = "Generate and apply SQLite schema migrations")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Database file to migrate.
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,
    /// Directory holding migration files.
    #[arg(short, long, global = true)]
    migrations: Option<PathBuf>,
    /// Structure dump written after a successful migration run.
    #[arg(short, long, global = true)]
    structure: Option<PathBuf>,
    /// SQL script executed on every database connection.
    #[arg(short, long, global = true)]
    init: Option<PathBuf>,
    /// YAML settings file (default: ./exodus.yml when present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a new migration file.
    Generate(GenerateArgs),
    /// Apply every migration newer than the last recorded one.
    Migrate,
    /// Show the recorded watermark and pending migrations.
    Status,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// Label appended to the migration timestamp.
    label: String,
    /// Generate a script that rebuilds this table and its dependents.
    #[arg(long, value_name = "TABLE")]
    recreate: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let result = resolve_settings(&cli.global).and_then(|settings| match cli.command {
        Command::Generate(args) => run_generate(&settings, args),
        Command::Migrate => run_migrate(&settings),
        Command::Status => run_status(&settings),
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Defaults, then the settings file, then command-line flags.
fn resolve_settings(args: &GlobalArgs) -> Result<Settings, String> {
    let mut settings = match settings_file(args.config.as_deref()) {
        Some(path) => Settings::load(&path)
            .map_err(|e| format!("Failed to load settings '{}': {e}", path.display()))?,
        None => Settings::default(),
    };

    if let Some(database) = &args.database {
        settings.database = database.clone();
    }
    if let Some(migrations) = &args.migrations {
        settings.migrations = migrations.clone();
    }
    if let Some(structure) = &args.structure {
        settings.structure = structure.clone();
    }
    let explicit_init = args.init.as_deref().or(settings.init.as_deref());
    settings.init = find_init_file(explicit_init, |key| std::env::var(key).ok());

    debug!(
        database = %settings.database.display(),
        migrations = %settings.migrations.display(),
        init = ?settings.init,
        "Resolved settings"
    );
    Ok(settings)
}

/// An explicit `--config` must exist; the default file is optional.
fn settings_file(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_SETTINGS_FILE);
            default.is_file().then_some(default)
        }
    }
}

fn run_generate(settings: &Settings, args: GenerateArgs) -> Result<(), String> {
    let generator = Generator::new(&settings.migrations, &settings.database)
        .with_init(settings.init.clone());
    let path = generator
        .generate(&args.label, args.recreate.as_deref())
        .map_err(|e| format!("Generate failed: {e}"))?;
    println!("Migration created in {}", path.display());
    Ok(())
}

fn run_migrate(settings: &Settings) -> Result<(), String> {
    let migrator = Migrator::new(&settings.database, &settings.migrations)
        .with_init(settings.init.clone());
    let report = migrator
        .migrate_with(|file| println!("Applying migration {}...", file.path.display()))
        .map_err(describe_failure)?;

    if report.applied.is_empty() {
        println!("Database is up to date.");
    } else {
        println!(
            "Applied {} migration(s); snapshot kept in {}.",
            report.applied.len(),
            report.snapshot.display()
        );
    }

    // The batch is already committed; a failing dump is reported only.
    let db = Database::open(&settings.database, settings.init.as_deref())
        .map_err(|e| format!("Failed to open database '{}': {e}", settings.database.display()))?;
    write_structure(&db, &settings.structure).map_err(|e| {
        format!(
            "Failed to write structure '{}': {e}",
            settings.structure.display()
        )
    })?;
    db.close().map_err(|e| e.to_string())?;
    Ok(())
}

fn run_status(settings: &Settings) -> Result<(), String> {
    let migrator = Migrator::new(&settings.database, &settings.migrations)
        .with_init(settings.init.clone());
    let status = migrator
        .status()
        .map_err(|e| format!("Status failed: {e}"))?;

    println!(
        "Watermark: {}",
        status.watermark.as_deref().unwrap_or("(none)")
    );
    println!("Applied: {}", status.applied.len());
    println!("Pending: {}", status.pending.len());
    for name in &status.pending {
        println!("  {name}");
    }
    Ok(())
}

fn describe_failure(err: SqliteError) -> String {
    match &err {
        SqliteError::BatchFailed { recovery, .. } if recovery.is_complete() => {
            format!("Migration failed: {err}\n{recovery}")
        }
        SqliteError::BatchFailed { recovery, .. } => {
            format!("Migration failed: {err}\nrecovery incomplete: {recovery}")
        }
        _ => format!("Migration failed: {err}"),
    }
}

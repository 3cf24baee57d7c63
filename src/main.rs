//! The annex batch tool.
//!
//! `annex clean-orphaned` reconciles an entity's attribute table against its
//! parent table: it previews the orphan count, asks for confirmation (the
//! deletion is irreversible), deletes, and reports the number removed.
//! Precondition failures are printed and the command returns without
//! mutating anything.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use annex::error::Result;
use annex::persist::Storage;
use annex::reconcile::{Confirmation, OrphanReconciler};
use annex::registry::{TableDescriptor, TypeRegistry};
use annex::settings::Settings;

#[derive(Parser)]
#[command(name = "annex", about = "Attribute metadata maintenance", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Delete attribute rows whose parent record no longer exists
    CleanOrphaned {
        /// Entity type whose attribute table is reconciled (e.g. "book")
        #[arg(long)]
        entity: String,
        /// SQLite database file (overrides settings)
        #[arg(long)]
        database: Option<String>,
        /// Parent table name, when it differs from the convention
        #[arg(long)]
        parent_table: Option<String>,
        /// Attribute table name, when it differs from the convention
        #[arg(long)]
        attribute_table: Option<String>,
        /// Foreign key column name, when it differs from the convention
        #[arg(long)]
        foreign_key: Option<String>,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::CleanOrphaned {
            entity,
            database,
            parent_table,
            attribute_table,
            foreign_key,
            yes,
        } => match clean_orphaned(
            &entity,
            database.as_deref(),
            parent_table.as_deref(),
            attribute_table.as_deref(),
            foreign_key.as_deref(),
            yes,
        ) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{e}");
                // Precondition failures are reported and the run still counts
                // as a clean exit; anything else failed mid-operation.
                if e.is_precondition() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            }
        },
    }
}

fn clean_orphaned(
    entity: &str,
    database: Option<&str>,
    parent_table: Option<&str>,
    attribute_table: Option<&str>,
    foreign_key: Option<&str>,
    yes: bool,
) -> Result<()> {
    let settings = Settings::load()?;
    let database = database.unwrap_or(&settings.database);

    let conventional = TableDescriptor::conventional(entity)?;
    let descriptor = TableDescriptor::new(
        entity,
        parent_table.unwrap_or(conventional.parent_table()),
        attribute_table.unwrap_or(conventional.attribute_table()),
        foreign_key.unwrap_or(conventional.foreign_key()),
    )?;

    let storage = Arc::new(Storage::open(database)?);
    let mut registry = TypeRegistry::new();
    let descriptor = registry.register(descriptor);
    let reconciler = OrphanReconciler::new(storage, Arc::new(registry), settings.batch_size);

    // Preview first; the preconditions are checked here as well, before any
    // prompt is shown.
    let preview = reconciler.reconcile(entity, Confirmation::Withheld)?;
    if preview.orphans == 0 {
        println!(
            "No orphaned rows in {}.",
            descriptor.attribute_table()
        );
        return Ok(());
    }

    println!(
        "WARNING: this will delete {} orphaned row(s) from {}.",
        preview.orphans,
        descriptor.attribute_table()
    );
    println!("It is strongly recommended to back up the database before proceeding.");
    if !yes && !confirm()? {
        println!("Operation cancelled.");
        return Ok(());
    }

    let outcome = reconciler.reconcile(entity, Confirmation::Granted)?;
    println!(
        "Deleted {} orphaned row(s) from {}.",
        outcome.orphans,
        descriptor.attribute_table()
    );
    Ok(())
}

fn confirm() -> Result<bool> {
    print!("[Y] to continue: ");
    io::stdout()
        .flush()
        .map_err(|e| annex::error::AnnexError::Configuration(e.to_string()))?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|e| annex::error::AnnexError::Configuration(e.to_string()))?;
    Ok(input.trim() == "Y")
}

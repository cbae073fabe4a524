mod cli;
mod error;
mod export;
mod fmt;
mod generator;
mod ledger;
mod models;
mod scenario;
mod settings;
mod tui;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, LedgerCommands};

/// Logs go to stderr so table output and the dashboard stay clean.
/// `RUST_LOG` overrides the default `warn` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        None => cli::dashboard::run(None),
        Some(Commands::Dashboard { file }) => cli::dashboard::run(file),
        Some(Commands::Simulate {
            revenue_pct,
            charges_pct,
            preset,
            overrides,
            seed,
            output,
        }) => cli::simulate::run(revenue_pct, charges_pct, preset.as_deref(), &overrides, seed, output),
        Some(Commands::Presets) => cli::simulate::presets(),
        Some(Commands::Ledger { command }) => match command {
            LedgerCommands::Categories { file } => cli::ledger::categories(file),
            LedgerCommands::Show { category, file } => cli::ledger::show(&category, file),
            LedgerCommands::Aggregate { category, file } => cli::ledger::aggregate(category, file),
            LedgerCommands::Edit {
                category,
                edits,
                output,
                file,
            } => cli::ledger::edit(&category, &edits, output, file),
            LedgerCommands::Export { output, file } => cli::ledger::export(output, file),
        },
        Some(Commands::Config { set }) => cli::config::run(&set),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

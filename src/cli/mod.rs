pub mod config;
pub mod dashboard;
pub mod ledger;
pub mod simulate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::settings::Settings;

/// `--file` when given, otherwise the ledger named in settings.
pub(crate) fn ledger_source(file: Option<String>, settings: &Settings) -> PathBuf {
    file.map(PathBuf::from).unwrap_or_else(|| settings.ledger_path())
}

#[derive(Parser)]
#[command(name = "bpsim", about = "Revenue & charges scenario simulator with an editable forecast ledger.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply a scenario to the base series and print the result.
    Simulate {
        /// Global revenue change in percent (-50..200)
        #[arg(long = "revenue-pct", default_value = "0", allow_hyphen_values = true)]
        revenue_pct: i32,
        /// Global charges change in percent (-50..200)
        #[arg(long = "charges-pct", default_value = "0", allow_hyphen_values = true)]
        charges_pct: i32,
        /// Named preset laid over the global values (see `bpsim presets`)
        #[arg(long)]
        preset: Option<String>,
        /// Per-year change YEAR:REVENUE_PCT:CHARGES_PCT; switches to per-year mode
        #[arg(long = "override", value_name = "YEAR:REV:CHG", allow_hyphen_values = true)]
        overrides: Vec<String>,
        /// Random seed for the base series
        #[arg(long)]
        seed: Option<u64>,
        /// Write the scenario CSV to this path
        #[arg(long)]
        output: Option<String>,
    },
    /// List the scenario presets.
    Presets,
    /// Inspect and edit the forecast ledger.
    Ledger {
        #[command(subcommand)]
        command: LedgerCommands,
    },
    /// Interactive two-tab dashboard.
    Dashboard {
        /// Ledger file (default: from settings)
        #[arg(long)]
        file: Option<String>,
    },
    /// Show or change settings.
    Config {
        /// key=value to store, e.g. seed=7
        #[arg(long)]
        set: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum LedgerCommands {
    /// List the categories present in the ledger.
    Categories {
        #[arg(long)]
        file: Option<String>,
    },
    /// Show the rows of one category.
    Show {
        #[arg(long)]
        category: String,
        #[arg(long)]
        file: Option<String>,
    },
    /// Sum a category per date, in K€.
    Aggregate {
        /// Category to aggregate (default: target_category setting)
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        file: Option<String>,
    },
    /// Replace a category's rows with an edited copy.
    Edit {
        /// Category whose rows are replaced
        #[arg(long)]
        category: String,
        /// CSV holding the edited rows (`,` or `;` separated)
        #[arg(long)]
        edits: String,
        /// Write the full edited ledger here
        #[arg(long)]
        output: Option<String>,
        #[arg(long)]
        file: Option<String>,
    },
    /// Export the full ledger as comma-separated CSV.
    Export {
        #[arg(long)]
        output: Option<String>,
        #[arg(long)]
        file: Option<String>,
    },
}

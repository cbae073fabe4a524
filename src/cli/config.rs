use comfy_table::{Cell, Table};

use crate::error::{BpError, Result};
use crate::settings::{load_settings, save_settings, settings_path};

pub fn run(set: &[String]) -> Result<()> {
    let mut settings = load_settings();

    if !set.is_empty() {
        for pair in set {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| BpError::Settings(format!("expected key=value, got '{pair}'")))?;
            settings.set(key.trim(), value.trim())?;
        }
        save_settings(&settings)?;
        println!("Saved {}", settings_path().display());
    }

    let mut table = Table::new();
    table.set_header(vec!["Setting", "Value"]);
    table.add_row(vec![Cell::new("data_dir"), Cell::new(&settings.data_dir)]);
    table.add_row(vec![Cell::new("ledger_file"), Cell::new(&settings.ledger_file)]);
    table.add_row(vec![Cell::new("seed"), Cell::new(settings.seed)]);
    table.add_row(vec![Cell::new("first_year"), Cell::new(settings.first_year)]);
    table.add_row(vec![Cell::new("last_year"), Cell::new(settings.last_year)]);
    table.add_row(vec![Cell::new("target_category"), Cell::new(&settings.target_category)]);
    println!("{table}");
    Ok(())
}

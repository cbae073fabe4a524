use std::path::Path;

use comfy_table::{Cell, Table};
use tracing::info;

use crate::cli::ledger_source;
use crate::error::Result;
use crate::export::{ledger_to_csv, write_export, LEDGER_FILE_NAME};
use crate::fmt::amount;
use crate::ledger::{aggregate_category, apply_user_edits, load_ledger_file, read_edited_rows, Ledger};
use crate::models::{AggregatedPoint, LedgerEntry};
use crate::settings::load_settings;

fn date_cell(entry: &LedgerEntry) -> String {
    entry
        .date
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "\u{2014}".to_string())
}

fn value_cell(entry: &LedgerEntry) -> String {
    entry.value.map(amount).unwrap_or_else(|| "\u{2014}".to_string())
}

fn print_points(title: &str, points: &[AggregatedPoint]) {
    if points.is_empty() {
        println!("{title}: no dated rows.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["Date", "Total (€)", "K€"]);
    for p in points {
        table.add_row(vec![
            Cell::new(p.date.format("%d/%m/%Y")),
            Cell::new(amount(p.value)),
            Cell::new(&p.label),
        ]);
    }
    println!("{title}\n{table}");
}

pub fn categories(file: Option<String>) -> Result<()> {
    let settings = load_settings();
    let ledger = load_ledger_file(&ledger_source(file, &settings))?;
    let mut table = Table::new();
    table.set_header(vec!["Category", "Rows"]);
    for cat in ledger.categories() {
        let count = ledger.entries.iter().filter(|e| e.category == cat).count();
        table.add_row(vec![Cell::new(&cat), Cell::new(count)]);
    }
    println!("{table}");
    Ok(())
}

pub fn show(category: &str, file: Option<String>) -> Result<()> {
    let settings = load_settings();
    let ledger = load_ledger_file(&ledger_source(file, &settings))?;
    let rows = ledger.filter_by_category(category);
    if rows.is_empty() {
        println!("No rows in category '{category}'.");
        return Ok(());
    }

    let extras = ledger.extra_columns();
    let mut header = vec!["Date", "Category", "Amount (€)"];
    header.extend(extras.iter().copied());
    let mut table = Table::new();
    table.set_header(header);
    for e in &rows {
        let mut cells = vec![Cell::new(date_cell(e)), Cell::new(&e.category), Cell::new(value_cell(e))];
        cells.extend(e.extra.iter().map(Cell::new));
        table.add_row(cells);
    }
    println!("{category}\n{table}");
    Ok(())
}

pub fn aggregate(category: Option<String>, file: Option<String>) -> Result<()> {
    let settings = load_settings();
    let ledger = load_ledger_file(&ledger_source(file, &settings))?;
    let category = category.unwrap_or(settings.target_category);
    print_points(&format!("{category} (K€)"), &aggregate_category(&ledger.entries, &category));
    Ok(())
}

/// Reconcile edits into the ledger and return the result.
pub fn edit_ledger(ledger: &Ledger, category: &str, edits_path: &Path) -> Result<Ledger> {
    let file = std::fs::File::open(edits_path)?;
    let edited = read_edited_rows(&ledger.columns, std::io::BufReader::new(file))?;
    let incomplete = edited.iter().filter(|e| e.date.is_none() || e.value.is_none()).count();
    if incomplete > 0 {
        info!(rows = incomplete, "edited rows kept with missing date or value");
    }
    Ok(apply_user_edits(ledger, category, edited))
}

pub fn edit(category: &str, edits: &str, output: Option<String>, file: Option<String>) -> Result<()> {
    let settings = load_settings();
    let ledger = load_ledger_file(&ledger_source(file, &settings))?;
    let edited = edit_ledger(&ledger, category, Path::new(edits))?;

    println!(
        "{category}: {} row(s) replaced by {}.",
        ledger.filter_by_category(category).len(),
        edited.filter_by_category(category).len(),
    );
    let target = &settings.target_category;
    print_points(&format!("{target} (K€)"), &aggregate_category(&edited.entries, target));

    if let Some(out) = output {
        let path = write_export(&ledger_to_csv(&edited)?, Path::new(&out))?;
        println!("Wrote {path}");
    }
    Ok(())
}

pub fn export(output: Option<String>, file: Option<String>) -> Result<()> {
    let settings = load_settings();
    let ledger = load_ledger_file(&ledger_source(file, &settings))?;
    let path = output
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| settings.exports_dir().join(LEDGER_FILE_NAME));
    let written = write_export(&ledger_to_csv(&ledger)?, &path)?;
    println!("Wrote {written}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::load_ledger;

    #[test]
    fn test_edit_ledger_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = load_ledger(
            "date;categorie;valeur\n01/01/2025;Chiffre d'affaires;1000\n01/01/2025;Charges;400\n".as_bytes(),
        )
        .unwrap();
        let edits = dir.path().join("edits.csv");
        std::fs::write(
            &edits,
            "date,categorie,valeur\n2025-01-01,Chiffre d'affaires,1500\n2025-01-01,Chiffre d'affaires,1000\n",
        )
        .unwrap();
        let out = edit_ledger(&ledger, "Chiffre d'affaires", &edits).unwrap();
        assert_eq!(out.entries.len(), 3);
        let points = aggregate_category(&out.entries, "Chiffre d'affaires");
        assert_eq!(points[0].value, 2500.0);
        assert_eq!(points[0].label, "3 K€");
    }

    #[test]
    fn test_cells_show_dash_for_missing() {
        let e = LedgerEntry {
            date: None,
            category: "X".to_string(),
            value: None,
            extra: Vec::new(),
        };
        assert_eq!(date_cell(&e), "\u{2014}");
        assert_eq!(value_cell(&e), "\u{2014}");
    }
}

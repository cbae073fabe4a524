use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::export::{scenario_to_csv, write_export};
use crate::fmt::{amount, ratio_pct, signed_pct};
use crate::generator::{generate_base_series, year_range};
use crate::models::SimulatedRow;
use crate::scenario::{apply_scenario, get_preset, parse_override, ScenarioParameters, ALL_PRESETS};
use crate::settings::load_settings;

/// Slider values plus overrides from the command line, before any preset.
pub fn build_parameters(revenue_pct: i32, charges_pct: i32, overrides: &[String]) -> Result<ScenarioParameters> {
    let mut params = ScenarioParameters {
        global_revenue_pct: revenue_pct,
        global_charges_pct: charges_pct,
        ..Default::default()
    };
    for raw in overrides {
        let (year, o) = parse_override(raw)?;
        params.per_year_overrides.insert(year, o);
    }
    params.per_year_enabled = !params.per_year_overrides.is_empty();
    Ok(params)
}

pub fn run(
    revenue_pct: i32,
    charges_pct: i32,
    preset: Option<&str>,
    overrides: &[String],
    seed: Option<u64>,
    output: Option<String>,
) -> Result<()> {
    let settings = load_settings();
    let sliders = build_parameters(revenue_pct, charges_pct, overrides)?;
    sliders.validate()?;
    let preset = preset.map(get_preset).transpose()?;
    let params = sliders.resolve(preset);
    params.validate()?;

    let years = year_range(settings.first_year, settings.last_year);
    let base = generate_base_series(&years, seed.unwrap_or(settings.seed));
    let rows = apply_scenario(&base, &params);

    print_table(&rows);
    print_summary(&params, &rows);

    if let Some(out) = output {
        let bytes = scenario_to_csv(&rows)?;
        let path = write_export(&bytes, Path::new(&out))?;
        println!("Wrote {path}");
    }
    Ok(())
}

fn print_table(rows: &[SimulatedRow]) {
    let mut table = Table::new();
    table.set_header(vec![
        "Year",
        "Revenue",
        "Charges",
        "Margin",
        "Margin %",
        "Revenue (sim)",
        "Charges (sim)",
        "Margin (sim)",
        "Margin % (sim)",
    ]);
    for r in rows {
        table.add_row(vec![
            Cell::new(r.year()),
            Cell::new(amount(r.base.revenue)),
            Cell::new(amount(r.base.charges)),
            Cell::new(amount(r.base.margin())),
            Cell::new(ratio_pct(r.base.margin_ratio())),
            Cell::new(amount(r.revenue_sim)),
            Cell::new(amount(r.charges_sim)),
            Cell::new(amount(r.margin_sim)),
            Cell::new(ratio_pct(r.margin_ratio_sim)),
        ]);
    }
    println!("Scenario\n{table}");
}

fn print_summary(params: &ScenarioParameters, rows: &[SimulatedRow]) {
    let mode = if params.per_year_enabled { "per year" } else { "global" };
    println!(
        "\nRevenue {}%  Charges {}%  ({mode})",
        signed_pct(params.global_revenue_pct),
        signed_pct(params.global_charges_pct),
    );

    let Some(last) = rows.last() else {
        return;
    };
    let mut table = Table::new();
    table.set_header(vec![format!("Summary {}", last.year()), String::new()]);
    table.add_row(vec![Cell::new("Revenue"), Cell::new(amount(last.base.revenue))]);
    table.add_row(vec![Cell::new("Revenue (sim)"), Cell::new(amount(last.revenue_sim))]);
    table.add_row(vec![Cell::new("Charges"), Cell::new(amount(last.base.charges))]);
    table.add_row(vec![Cell::new("Charges (sim)"), Cell::new(amount(last.charges_sim))]);
    table.add_row(vec![Cell::new("Margin"), Cell::new(amount(last.base.margin()))]);
    let margin_label = if last.margin_sim >= 0.0 {
        "Margin (sim)".green().bold()
    } else {
        "Margin (sim)".red().bold()
    };
    table.add_row(vec![Cell::new(margin_label), Cell::new(amount(last.margin_sim))]);
    table.add_row(vec![
        Cell::new("Margin % (sim)"),
        Cell::new(ratio_pct(last.margin_ratio_sim)),
    ]);
    println!("{table}");
}

pub fn presets() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Key", "Description"]);
    for p in ALL_PRESETS {
        table.add_row(vec![Cell::new(p.key()), Cell::new(p.label())]);
    }
    println!("{table}");
    Ok(())
}

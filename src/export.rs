use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BpError, Result};
use crate::ledger::Ledger;
use crate::models::SimulatedRow;

pub const SCENARIO_FILE_NAME: &str = "scenario_simulation.csv";
pub const LEDGER_FILE_NAME: &str = "scenario_edite.csv";

/// One line of the scenario export, in its fixed column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    #[serde(rename = "annee")]
    pub year: i32,
    #[serde(rename = "ca")]
    pub revenue: f64,
    pub charges: f64,
    #[serde(rename = "ca_simu")]
    pub revenue_sim: f64,
    #[serde(rename = "charges_simu")]
    pub charges_sim: f64,
    #[serde(rename = "marge_simu")]
    pub margin_sim: f64,
    /// Empty cell when the ratio is undefined.
    #[serde(rename = "marge_pct_simu")]
    pub margin_ratio_sim: Option<f64>,
}

impl From<&SimulatedRow> for ScenarioRecord {
    fn from(row: &SimulatedRow) -> Self {
        Self {
            year: row.base.year,
            revenue: row.base.revenue,
            charges: row.base.charges,
            revenue_sim: row.revenue_sim,
            charges_sim: row.charges_sim,
            margin_sim: row.margin_sim,
            margin_ratio_sim: row.margin_ratio_sim,
        }
    }
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    wtr.into_inner().map_err(|e| BpError::Io(e.into_error()))
}

/// Comma-separated UTF-8 with a header row and no index column.
pub fn scenario_to_csv(rows: &[SimulatedRow]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for row in rows {
        if let Err(e) = row.ratio_or_err() {
            warn!(error = %e, "marge_pct_simu left empty");
        }
        wtr.serialize(ScenarioRecord::from(row))?;
    }
    if rows.is_empty() {
        wtr.write_record([
            "annee",
            "ca",
            "charges",
            "ca_simu",
            "charges_simu",
            "marge_simu",
            "marge_pct_simu",
        ])?;
    }
    finish(wtr)
}

/// The whole ledger, every category, in source column order.
pub fn ledger_to_csv(ledger: &Ledger) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(&ledger.columns)?;
    for entry in &ledger.entries {
        wtr.write_record(ledger.record_for(entry))?;
    }
    finish(wtr)
}

pub fn write_export(bytes: &[u8], path: &Path) -> Result<String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, bytes)?;
    let shown = path.display().to_string();
    info!(path = %shown, bytes = bytes.len(), "wrote export");
    Ok(shown)
}

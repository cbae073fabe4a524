use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{BpError, Result};
use crate::models::{SimulatedRow, TimeSeriesRow};

pub const PCT_MIN: i32 = -50;
pub const PCT_MAX: i32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct YearOverride {
    pub revenue_pct: i32,
    pub charges_pct: i32,
}

/// Immutable scenario inputs. When `per_year_enabled` is set, each row uses
/// its own override (0 % when absent) and the global percentages are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScenarioParameters {
    pub global_revenue_pct: i32,
    pub global_charges_pct: i32,
    pub per_year_enabled: bool,
    pub per_year_overrides: BTreeMap<i32, YearOverride>,
}

impl ScenarioParameters {
    pub fn validate(&self) -> Result<()> {
        check_pct("global revenue %", self.global_revenue_pct)?;
        check_pct("global charges %", self.global_charges_pct)?;
        for (year, o) in &self.per_year_overrides {
            check_pct(&format!("revenue % for {year}"), o.revenue_pct)?;
            check_pct(&format!("charges % for {year}"), o.charges_pct)?;
        }
        Ok(())
    }

    /// Effective parameters: these values with the preset's fields laid over
    /// them. Resolved once, before any computation.
    pub fn resolve(&self, preset: Option<Preset>) -> Self {
        match preset {
            Some(p) => p.apply(self),
            None => self.clone(),
        }
    }

    /// Percentages applied to `year` as (revenue, charges).
    pub fn pct_for(&self, year: i32) -> (i32, i32) {
        if self.per_year_enabled {
            self.per_year_overrides
                .get(&year)
                .map(|o| (o.revenue_pct, o.charges_pct))
                .unwrap_or((0, 0))
        } else {
            (self.global_revenue_pct, self.global_charges_pct)
        }
    }
}

fn check_pct(field: &str, value: i32) -> Result<()> {
    if (PCT_MIN..=PCT_MAX).contains(&value) {
        Ok(())
    } else {
        Err(BpError::PercentOutOfRange {
            field: field.to_string(),
            value,
        })
    }
}

pub fn clamp_pct(value: i32) -> i32 {
    value.clamp(PCT_MIN, PCT_MAX)
}

/// Parse `YEAR:REVENUE_PCT:CHARGES_PCT`, e.g. `2024:5:-10`.
pub fn parse_override(raw: &str) -> Result<(i32, YearOverride)> {
    let parts: Vec<&str> = raw.trim().split(':').collect();
    if parts.len() != 3 {
        return Err(BpError::InvalidOverride(raw.to_string()));
    }
    let parse = |s: &str| -> Result<i32> {
        s.trim()
            .parse()
            .map_err(|_| BpError::InvalidOverride(raw.to_string()))
    };
    let year = parse(parts[0])?;
    let o = YearOverride {
        revenue_pct: parse(parts[1])?,
        charges_pct: parse(parts[2])?,
    };
    Ok((year, o))
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    CostCut20,
    RevenueUp10,
}

pub const ALL_PRESETS: &[Preset] = &[Preset::CostCut20, Preset::RevenueUp10];

impl Preset {
    pub fn key(&self) -> &'static str {
        match self {
            Self::CostCut20 => "cost_cut_20",
            Self::RevenueUp10 => "revenue_up_10",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::CostCut20 => "Cost reduction 20%",
            Self::RevenueUp10 => "Revenue +10%",
        }
    }

    /// Sets the preset's global field(s) and leaves everything else alone.
    pub fn apply(&self, params: &ScenarioParameters) -> ScenarioParameters {
        let mut out = params.clone();
        match self {
            Self::CostCut20 => out.global_charges_pct = -20,
            Self::RevenueUp10 => out.global_revenue_pct = 10,
        }
        debug!(preset = self.key(), "applied preset");
        out
    }
}

pub fn get_preset(key: &str) -> Result<Preset> {
    let norm = key.trim().replace('-', "_").to_lowercase();
    ALL_PRESETS
        .iter()
        .find(|p| p.key() == norm)
        .copied()
        .ok_or_else(|| BpError::UnknownPreset(key.to_string()))
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

fn adjust(value: f64, pct: i32) -> f64 {
    value * (1.0 + pct as f64 / 100.0)
}

/// Recompute the whole simulated series from the base rows and parameters.
pub fn apply_scenario(base: &[TimeSeriesRow], params: &ScenarioParameters) -> Vec<SimulatedRow> {
    base.iter()
        .map(|row| {
            let (rev_pct, chg_pct) = params.pct_for(row.year);
            SimulatedRow::from_base(row, adjust(row.revenue, rev_pct), adjust(row.charges, chg_pct))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn row(year: i32, revenue: f64, charges: f64) -> TimeSeriesRow {
        TimeSeriesRow { year, revenue, charges }
    }

    #[test]
    fn test_global_scenario() {
        let params = ScenarioParameters {
            global_revenue_pct: 10,
            global_charges_pct: -20,
            ..Default::default()
        };
        let out = apply_scenario(&[row(2023, 1000.0, 600.0)], &params);
        assert_eq!(out.len(), 1);
        let r = &out[0];
        assert!(approx(r.revenue_sim, 1100.0));
        assert!(approx(r.charges_sim, 480.0));
        assert!(approx(r.margin_sim, 620.0));
        assert!(approx(r.margin_ratio_sim.unwrap(), 620.0 / 1100.0));
    }

    #[test]
    fn test_per_year_override_replaces_global() {
        let mut overrides = BTreeMap::new();
        overrides.insert(2023, YearOverride { revenue_pct: 5, charges_pct: 0 });
        let params = ScenarioParameters {
            global_revenue_pct: 50,
            global_charges_pct: -30,
            per_year_enabled: true,
            per_year_overrides: overrides,
        };
        let out = apply_scenario(&[row(2023, 1000.0, 600.0)], &params);
        assert!(approx(out[0].revenue_sim, 1050.0));
        assert!(approx(out[0].charges_sim, 600.0));
    }

    #[test]
    fn test_missing_override_is_zero() {
        let mut overrides = BTreeMap::new();
        overrides.insert(2023, YearOverride { revenue_pct: 5, charges_pct: 5 });
        let params = ScenarioParameters {
            global_revenue_pct: 10,
            global_charges_pct: 10,
            per_year_enabled: true,
            per_year_overrides: overrides,
        };
        let out = apply_scenario(&[row(2023, 1000.0, 600.0), row(2024, 2000.0, 900.0)], &params);
        assert_eq!(out[1].revenue_sim, 2000.0);
        assert_eq!(out[1].charges_sim, 900.0);
    }

    #[test]
    fn test_overrides_ignored_when_disabled() {
        let mut overrides = BTreeMap::new();
        overrides.insert(2023, YearOverride { revenue_pct: 100, charges_pct: 100 });
        let params = ScenarioParameters {
            global_revenue_pct: 0,
            global_charges_pct: 0,
            per_year_enabled: false,
            per_year_overrides: overrides,
        };
        let out = apply_scenario(&[row(2023, 1000.0, 600.0)], &params);
        assert_eq!(out[0].revenue_sim, 1000.0);
        assert_eq!(out[0].charges_sim, 600.0);
    }

    #[test]
    fn test_zero_simulated_revenue_is_undefined_ratio() {
        let params = ScenarioParameters::default();
        let out = apply_scenario(&[row(2023, 0.0, 100.0)], &params);
        assert!(out[0].margin_ratio_sim.is_none());
        assert!(out[0].ratio_or_err().is_err());
    }

    #[test]
    fn test_preset_overrides_slider_only_for_its_field() {
        let sliders = ScenarioParameters {
            global_revenue_pct: 7,
            global_charges_pct: 15,
            ..Default::default()
        };
        let eff = sliders.resolve(Some(Preset::CostCut20));
        assert_eq!(eff.global_charges_pct, -20);
        assert_eq!(eff.global_revenue_pct, 7);

        let eff = sliders.resolve(Some(Preset::RevenueUp10));
        assert_eq!(eff.global_revenue_pct, 10);
        assert_eq!(eff.global_charges_pct, 15);

        assert_eq!(sliders.resolve(None), sliders);
    }

    #[test]
    fn test_get_preset_accepts_dashes() {
        assert_eq!(get_preset("cost-cut-20").unwrap(), Preset::CostCut20);
        assert_eq!(get_preset("REVENUE_UP_10").unwrap(), Preset::RevenueUp10);
        assert!(matches!(get_preset("moonshot"), Err(BpError::UnknownPreset(_))));
    }

    #[test]
    fn test_validate_range() {
        let mut p = ScenarioParameters { global_revenue_pct: 200, global_charges_pct: -50, ..Default::default() };
        assert!(p.validate().is_ok());
        p.global_revenue_pct = 201;
        assert!(matches!(p.validate(), Err(BpError::PercentOutOfRange { value: 201, .. })));
        p.global_revenue_pct = 0;
        p.per_year_overrides.insert(2024, YearOverride { revenue_pct: 0, charges_pct: -51 });
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("2024:5:-10").unwrap(),
            (2024, YearOverride { revenue_pct: 5, charges_pct: -10 })
        );
        assert!(parse_override("2024:5").is_err());
        assert!(parse_override("abc:1:2").is_err());
    }

    #[test]
    fn test_clamp_pct() {
        assert_eq!(clamp_pct(-80), -50);
        assert_eq!(clamp_pct(250), 200);
        assert_eq!(clamp_pct(12), 12);
    }
}

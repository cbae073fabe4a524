use chrono::NaiveDate;

use crate::error::{BpError, Result};

/// One year of the reference series, before any scenario is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRow {
    pub year: i32,
    pub revenue: f64,
    pub charges: f64,
}

impl TimeSeriesRow {
    pub fn margin(&self) -> f64 {
        self.revenue - self.charges
    }

    /// `None` when revenue is zero.
    pub fn margin_ratio(&self) -> Option<f64> {
        ratio(self.margin(), self.revenue)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedRow {
    pub base: TimeSeriesRow,
    pub revenue_sim: f64,
    pub charges_sim: f64,
    pub margin_sim: f64,
    /// `None` marks an undefined ratio (simulated revenue of zero).
    pub margin_ratio_sim: Option<f64>,
}

impl SimulatedRow {
    pub fn from_base(base: &TimeSeriesRow, revenue_sim: f64, charges_sim: f64) -> Self {
        let margin_sim = revenue_sim - charges_sim;
        Self {
            base: base.clone(),
            revenue_sim,
            charges_sim,
            margin_sim,
            margin_ratio_sim: ratio(margin_sim, revenue_sim),
        }
    }

    pub fn year(&self) -> i32 {
        self.base.year
    }

    /// The simulated margin ratio, or `DivisionUndefined` when revenue is zero.
    pub fn ratio_or_err(&self) -> Result<f64> {
        self.margin_ratio_sim
            .ok_or(BpError::DivisionUndefined { year: self.base.year })
    }
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}

/// A dated, categorized amount from the forecast ledger. Columns other than
/// date/category/value ride along in `extra`, in source column order.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub date: Option<NaiveDate>,
    pub category: String,
    pub value: Option<f64>,
    pub extra: Vec<String>,
}

/// Chart-ready point: one date of the target category, values summed.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub value_k: i64,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_row_derived_fields() {
        let row = TimeSeriesRow { year: 2023, revenue: 1000.0, charges: 600.0 };
        assert_eq!(row.margin(), 400.0);
        assert_eq!(row.margin_ratio(), Some(0.4));
    }

    #[test]
    fn test_zero_revenue_ratio_is_undefined() {
        let row = TimeSeriesRow { year: 2024, revenue: 0.0, charges: 10.0 };
        assert_eq!(row.margin_ratio(), None);
        let sim = SimulatedRow::from_base(&row, 0.0, 10.0);
        assert_eq!(sim.margin_sim, -10.0);
        assert!(sim.margin_ratio_sim.is_none());
        assert!(matches!(
            sim.ratio_or_err(),
            Err(BpError::DivisionUndefined { year: 2024 })
        ));
    }
}

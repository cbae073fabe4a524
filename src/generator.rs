use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use tracing::debug;

use crate::models::TimeSeriesRow;

const REVENUE_START: f64 = 800_000.0;
const REVENUE_END: f64 = 1_200_000.0;
const REVENUE_NOISE: f64 = 0.03;

// Charges as a share of revenue, declining across the horizon.
const CHARGES_SHARE_START: f64 = 0.65;
const CHARGES_SHARE_END: f64 = 0.55;
const CHARGES_NOISE: f64 = 0.02;

// Draws are clipped to this many standard deviations.
const NOISE_CLIP: f64 = 3.0;

pub fn year_range(first: i32, last: i32) -> Vec<i32> {
    (first..=last).collect()
}

/// Evenly spaced values from `start` to `end` inclusive.
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

fn noise(rng: &mut StdRng, n: usize, std_dev: f64) -> Vec<f64> {
    (0..n)
        .map(|_| {
            let z: f64 = StandardNormal.sample(&mut *rng);
            1.0 + z.clamp(-NOISE_CLIP, NOISE_CLIP) * std_dev
        })
        .collect()
}

/// Build the reference series: revenue trending up from 800k to 1.2M and
/// charges as a declining share of it, both with multiplicative noise.
/// Same seed and years always yield the same rows.
pub fn generate_base_series(years: &[i32], seed: u64) -> Vec<TimeSeriesRow> {
    let mut years = years.to_vec();
    years.sort_unstable();
    years.dedup();
    let n = years.len();

    let mut rng = StdRng::seed_from_u64(seed);
    // All revenue draws come before all charges draws.
    let revenue_noise = noise(&mut rng, n, REVENUE_NOISE);
    let charges_noise = noise(&mut rng, n, CHARGES_NOISE);

    let trend = linspace(REVENUE_START, REVENUE_END, n);
    let share = linspace(CHARGES_SHARE_START, CHARGES_SHARE_END, n);

    let rows: Vec<TimeSeriesRow> = years
        .iter()
        .enumerate()
        .map(|(i, &year)| {
            let revenue = (trend[i] * revenue_noise[i]).round();
            let charges = (revenue * share[i] * charges_noise[i]).round();
            TimeSeriesRow { year, revenue, charges }
        })
        .collect();

    debug!(seed, years = n, "generated base series");
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_is_deterministic() {
        let years = year_range(2023, 2028);
        let a = generate_base_series(&years, 42);
        let b = generate_base_series(&years, 42);
        assert_eq!(a, b);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.revenue.to_bits(), y.revenue.to_bits());
            assert_eq!(x.charges.to_bits(), y.charges.to_bits());
        }
    }

    #[test]
    fn test_different_seed_changes_values() {
        let years = year_range(2023, 2028);
        assert_ne!(generate_base_series(&years, 1), generate_base_series(&years, 2));
    }

    #[test]
    fn test_rows_are_unique_and_ascending() {
        let rows = generate_base_series(&[2025, 2023, 2024, 2023], 42);
        let years: Vec<i32> = rows.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2023, 2024, 2025]);
    }

    #[test]
    fn test_values_stay_near_trend() {
        let rows = generate_base_series(&year_range(2023, 2028), 42);
        assert_eq!(rows.len(), 6);
        for row in &rows {
            // noise is clipped at 3 std devs: 9% on revenue
            assert!(row.revenue > 727_000.0 && row.revenue < 1_309_000.0);
            let share = row.charges / row.revenue;
            assert!(share > 0.45 && share < 0.75, "share {share}");
            assert_eq!(row.revenue.fract(), 0.0);
            assert_eq!(row.charges.fract(), 0.0);
        }
    }

    #[test]
    fn test_noise_is_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let factors = noise(&mut rng, 20_000, 0.1);
        assert!(factors.iter().all(|f| (0.699..=1.301).contains(f)));
        // some draw lands past one standard deviation
        assert!(factors.iter().any(|f| (f - 1.0).abs() > 0.1));
    }

    #[test]
    fn test_linspace_edges() {
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(5.0, 9.0, 1), vec![5.0]);
        assert_eq!(linspace(0.65, 0.55, 3).len(), 3);
        assert_eq!(linspace(800.0, 1200.0, 5), vec![800.0, 900.0, 1000.0, 1100.0, 1200.0]);
    }

    #[test]
    fn test_empty_years() {
        assert!(generate_base_series(&[], 42).is_empty());
    }
}

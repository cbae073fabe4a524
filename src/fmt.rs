/// Group the digits of a whole number with a space: 1 234 567
fn group_thousands(int_part: &str) -> String {
    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    grouped.chars().rev().collect()
}

/// Format a euro amount rounded to the unit with space separators: 1 234 567
pub fn amount(val: f64) -> String {
    let rounded = format!("{:.0}", val.abs());
    let grouped = group_thousands(&rounded);
    if val < 0.0 && rounded != "0" {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// A ratio as a percentage with one decimal; `n/a` when undefined.
pub fn ratio_pct(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:.1} %", r * 100.0),
        None => "n/a".to_string(),
    }
}

/// Slider value with an explicit sign: +10, -20, +0
pub fn signed_pct(pct: i32) -> String {
    format!("{pct:+}")
}

/// Compact label for chart axes: 1.2M, 850k
pub fn compact(val: f64) -> String {
    let abs = val.abs();
    let sign = if val < 0.0 { "-" } else { "" };
    if abs >= 1_000_000.0 {
        format!("{sign}{:.1}M", abs / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{sign}{:.0}k", abs / 1_000.0)
    } else {
        format!("{sign}{abs:.0}")
    }
}

//! Stateless aggregations over normalized records. Every function recomputes from
//! the full table it is handed.

pub mod agents;
pub mod monthly;
pub mod pipeline;
pub mod plan;
pub mod projects;
pub mod staff;
pub mod timeline;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const MILLION: f64 = 1_000_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountRow {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountRow {
    pub label: String,
    pub amount: f64,
}

pub fn to_millions(amount: f64) -> f64 {
    amount / MILLION
}

/// `numerator / denominator * 100`, or zero when the denominator is zero.
pub fn ratio_pct(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator * 100.0
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Middle value; the mean of the two middle values for even counts.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Occurrences per label, most frequent first, ties by label.
pub fn count_by<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<CountRow> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    let mut rows: Vec<CountRow> = counts
        .into_iter()
        .map(|(label, count)| CountRow {
            label: label.to_string(),
            count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    rows
}

/// Summed amount per label, largest first.
pub fn sum_by<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Vec<AmountRow> {
    let mut sums: HashMap<&str, f64> = HashMap::new();
    for (label, amount) in pairs {
        *sums.entry(label).or_insert(0.0) += amount;
    }
    let mut rows: Vec<AmountRow> = sums
        .into_iter()
        .map(|(label, amount)| AmountRow {
            label: label.to_string(),
            amount,
        })
        .collect();
    rows.sort_by(|a, b| b.amount.total_cmp(&a.amount).then_with(|| a.label.cmp(&b.label)));
    rows
}

#[cfg(test)]
mod tests {
    use super::{count_by, median, ratio_pct, sum_by};

    #[test]
    fn ratio_guards_zero_denominator() {
        assert_eq!(ratio_pct(3.0, 0.0), 0.0);
        assert_eq!(ratio_pct(1.0, 4.0), 25.0);
    }

    #[test]
    fn median_handles_even_and_empty() {
        assert_eq!(median(&[]), 0.0);
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn grouping_orders_by_size() {
        let counts = count_by(["b", "a", "b"]);
        assert_eq!(counts[0].label, "b");
        assert_eq!(counts[0].count, 2);

        let sums = sum_by([("x", 1.0), ("y", 5.0), ("x", 2.0)]);
        assert_eq!(sums[0].label, "y");
        assert_eq!(sums[1].amount, 3.0);
    }
}

//! Categorical distributions and Kullback-Leibler divergence.

use crate::dataset::{Column, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Frequency of each distinct non-null value in a column, keyed by value text
pub fn value_counts(column: &Column) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for value in column.values.iter().filter(|v| !v.is_null()) {
        let key = match value {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        };
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

/// Two count vectors aligned over the same sorted category list
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedCounts {
    pub categories: Vec<String>,
    pub candidate: Vec<f64>,
    pub reference: Vec<f64>,
}

/// Align two frequency tables over the union of their categories.
///
/// Categories are sorted lexicographically; a category absent from one side
/// gets a zero count there.
pub fn align_counts(
    candidate: &BTreeMap<String, u64>,
    reference: &BTreeMap<String, u64>,
) -> AlignedCounts {
    let categories: Vec<String> = candidate
        .keys()
        .chain(reference.keys())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let lookup = |table: &BTreeMap<String, u64>| -> Vec<f64> {
        categories
            .iter()
            .map(|c| table.get(c).copied().unwrap_or(0) as f64)
            .collect()
    };

    AlignedCounts {
        candidate: lookup(candidate),
        reference: lookup(reference),
        categories,
    }
}

/// KL divergence D(p || q) in bits.
///
/// Both inputs are non-negative weights and are normalised to sum to one
/// first. Terms with `p_i == 0` contribute nothing; a term with `p_i > 0` and
/// `q_i == 0` makes the divergence infinite. Returns NaN when the inputs differ
/// in length or either side has no mass.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    if p.len() != q.len() {
        return f64::NAN;
    }
    let p_total: f64 = p.iter().sum();
    let q_total: f64 = q.iter().sum();
    if !(p_total > 0.0 && q_total > 0.0) {
        return f64::NAN;
    }

    let nats: f64 = p
        .iter()
        .zip(q)
        .map(|(pi, qi)| relative_entropy(pi / p_total, qi / q_total))
        .sum();
    nats / std::f64::consts::LN_2
}

fn relative_entropy(p: f64, q: f64) -> f64 {
    if p > 0.0 && q > 0.0 {
        p * (p / q).ln()
    } else if p == 0.0 && q >= 0.0 {
        0.0
    } else {
        f64::INFINITY
    }
}

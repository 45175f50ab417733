//! The data checks. Each one is a pure function of its inputs.

use super::divergence::{align_counts, kl_divergence, value_counts};
use super::violation::{Verdict, Violation};
use crate::constants::{
    self, BOROUGH_COLUMN, KNOWN_BOROUGHS, LATITUDE_COLUMN, LONGITUDE_COLUMN, MAX_LATITUDE,
    MAX_LONGITUDE, MAX_ROWS_EXCLUSIVE, MIN_LATITUDE, MIN_LONGITUDE, MIN_ROWS_EXCLUSIVE,
    PRICE_COLUMN,
};
use crate::dataset::{Column, Dataset, Value};
use std::collections::BTreeSet;

/// Label used for null cells when reporting categorical values
pub const NULL_LABEL: &str = "<null>";

/// Column names must equal the listing schema, position by position
pub fn check_column_names(data: &Dataset) -> Verdict {
    let expected = constants::expected_columns();
    let actual = data.column_names();

    if actual == expected {
        Verdict::Pass
    } else {
        Verdict::Fail(Violation::Schema {
            expected: expected.iter().map(|s| s.to_string()).collect(),
            actual: actual.iter().map(|s| s.to_string()).collect(),
        })
    }
}

/// The distinct boroughs must be exactly the five known ones
pub fn check_neighbourhood_names(data: &Dataset) -> Verdict {
    let column = match require(data, BOROUGH_COLUMN) {
        Ok(c) => c,
        Err(v) => return Verdict::Fail(v),
    };

    let seen: BTreeSet<String> = column
        .values
        .iter()
        .map(|v| match v {
            Value::Null => NULL_LABEL.to_string(),
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    let known: BTreeSet<String> = KNOWN_BOROUGHS.iter().map(|s| s.to_string()).collect();

    if seen == known {
        return Verdict::Pass;
    }
    Verdict::Fail(Violation::Domain {
        column: BOROUGH_COLUMN.to_string(),
        unexpected: seen.difference(&known).cloned().collect(),
        missing: known.difference(&seen).cloned().collect(),
    })
}

/// Every listing must lie inside the NYC bounding box
pub fn check_proper_boundaries(data: &Dataset) -> Verdict {
    let longitude = match require(data, LONGITUDE_COLUMN) {
        Ok(c) => c,
        Err(v) => return Verdict::Fail(v),
    };
    let latitude = match require(data, LATITUDE_COLUMN) {
        Ok(c) => c,
        Err(v) => return Verdict::Fail(v),
    };

    let outside = longitude
        .values
        .iter()
        .zip(&latitude.values)
        .filter(|(lon, lat)| {
            !(within(lon, MIN_LONGITUDE, MAX_LONGITUDE) && within(lat, MIN_LATITUDE, MAX_LATITUDE))
        })
        .count();

    if outside == 0 {
        return Verdict::Pass;
    }
    Verdict::Fail(Violation::Geography {
        count: outside,
        longitude: [MIN_LONGITUDE, MAX_LONGITUDE],
        latitude: [MIN_LATITUDE, MAX_LATITUDE],
    })
}

/// The borough distribution must not drift away from the reference batch.
///
/// Computes KL(candidate || reference) in bits; passes only when the
/// divergence is strictly below `kl_threshold`.
pub fn check_similar_neigh_distrib(
    data: &Dataset,
    reference: &Dataset,
    kl_threshold: f64,
) -> Verdict {
    match neighbourhood_divergence(data, reference) {
        Ok(divergence) => drift_verdict(divergence, kl_threshold),
        Err(v) => Verdict::Fail(v),
    }
}

/// Verdict for an already computed borough divergence
pub fn drift_verdict(divergence: f64, kl_threshold: f64) -> Verdict {
    if divergence < kl_threshold {
        Verdict::Pass
    } else {
        Verdict::Fail(Violation::Drift {
            divergence,
            threshold: kl_threshold,
        })
    }
}

/// KL divergence of the candidate's borough distribution from the reference's
pub fn neighbourhood_divergence(data: &Dataset, reference: &Dataset) -> Result<f64, Violation> {
    let candidate_counts = value_counts(require(data, BOROUGH_COLUMN)?);
    let reference_counts = value_counts(require(reference, BOROUGH_COLUMN)?);
    let aligned = align_counts(&candidate_counts, &reference_counts);
    Ok(kl_divergence(&aligned.candidate, &aligned.reference))
}

/// The row count must be plausible for a full listings dump
pub fn check_row_count(data: &Dataset) -> Verdict {
    let rows = data.row_count();
    if rows > MIN_ROWS_EXCLUSIVE && rows < MAX_ROWS_EXCLUSIVE {
        Verdict::Pass
    } else {
        Verdict::Fail(Violation::Cardinality {
            rows,
            min_exclusive: MIN_ROWS_EXCLUSIVE,
            max_exclusive: MAX_ROWS_EXCLUSIVE,
        })
    }
}

/// Every price must lie in `[min_price, max_price]`
pub fn check_price_range(data: &Dataset, min_price: f64, max_price: f64) -> Verdict {
    let price = match require(data, PRICE_COLUMN) {
        Ok(c) => c,
        Err(v) => return Verdict::Fail(v),
    };

    let outside = price
        .values
        .iter()
        .filter(|v| !within(v, min_price, max_price))
        .count();

    if outside == 0 {
        Verdict::Pass
    } else {
        Verdict::Fail(Violation::Range {
            field: PRICE_COLUMN.to_string(),
            count: outside,
            lower: min_price,
            upper: max_price,
        })
    }
}

fn require<'a>(data: &'a Dataset, name: &str) -> Result<&'a Column, Violation> {
    data.column(name).ok_or_else(|| Violation::MissingColumn {
        column: name.to_string(),
    })
}

/// Closed-interval test; null and non-numeric cells are never within bounds
fn within(value: &Value, lower: f64, upper: f64) -> bool {
    value
        .as_f64()
        .map(|x| x >= lower && x <= upper)
        .unwrap_or(false)
}

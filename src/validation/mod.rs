//! Data validation: the checks that decide whether a cleaned listings
//! dataset is fit to feed into training.
//!
//! Every check is an independent pure function over a [`Dataset`] (and, for
//! the drift check, a reference dataset) returning a [`Verdict`]. The
//! [`DataValidator`] runs the whole battery and collects every outcome into a
//! [`ValidationReport`]; it never stops at the first failure.

pub mod checks;
pub mod divergence;
pub mod harness;
pub mod violation;

pub use harness::{
    CheckOutcome, CheckReporter, DataValidator, MemoryReporter, TracingReporter, ValidationReport,
};
pub use violation::{Verdict, Violation, ViolationKind};

use crate::config::Config;
use crate::dataset::Dataset;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar inputs to the checks, fixed for one validation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCheckParameters")]
pub struct CheckParameters {
    pub min_price: f64,
    pub max_price: f64,
    pub kl_threshold: f64,
}

/// Wire form, checked by [`CheckParameters::new`] on the way in
#[derive(Deserialize)]
struct RawCheckParameters {
    min_price: f64,
    max_price: f64,
    kl_threshold: f64,
}

impl TryFrom<RawCheckParameters> for CheckParameters {
    type Error = PipelineError;

    fn try_from(raw: RawCheckParameters) -> Result<Self> {
        Self::new(raw.min_price, raw.max_price, raw.kl_threshold)
    }
}

impl CheckParameters {
    pub fn new(min_price: f64, max_price: f64, kl_threshold: f64) -> Result<Self> {
        if !(min_price.is_finite() && max_price.is_finite() && min_price < max_price) {
            return Err(PipelineError::InvalidParameters(format!(
                "min_price ({}) must be below max_price ({})",
                min_price, max_price
            )));
        }
        if !(kl_threshold.is_finite() && kl_threshold >= 0.0) {
            return Err(PipelineError::InvalidParameters(format!(
                "kl_threshold must be non-negative, got {}",
                kl_threshold
            )));
        }
        Ok(Self {
            min_price,
            max_price,
            kl_threshold,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.etl.min_price,
            config.etl.max_price,
            config.data_check.kl_threshold,
        )
    }
}

/// The six checks, in reporting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckId {
    ColumnNames,
    NeighbourhoodNames,
    ProperBoundaries,
    SimilarNeighDistrib,
    RowCount,
    PriceRange,
}

impl CheckId {
    pub const ALL: [CheckId; 6] = [
        CheckId::ColumnNames,
        CheckId::NeighbourhoodNames,
        CheckId::ProperBoundaries,
        CheckId::SimilarNeighDistrib,
        CheckId::RowCount,
        CheckId::PriceRange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckId::ColumnNames => "column_names",
            CheckId::NeighbourhoodNames => "neighbourhood_names",
            CheckId::ProperBoundaries => "proper_boundaries",
            CheckId::SimilarNeighDistrib => "similar_neigh_distrib",
            CheckId::RowCount => "row_count",
            CheckId::PriceRange => "price_range",
        }
    }

    /// Whether the check compares against a reference dataset
    pub fn needs_reference(&self) -> bool {
        matches!(self, CheckId::SimilarNeighDistrib)
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate `data` (and optionally a reference) with the `tracing` reporter
pub fn validate(
    data: &Dataset,
    reference: Option<&Dataset>,
    params: CheckParameters,
) -> ValidationReport {
    DataValidator::with_tracing(params).validate(data, reference)
}

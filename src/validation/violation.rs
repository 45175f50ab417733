use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The family a data-quality violation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Column set or order mismatch
    Schema,
    /// Unexpected or missing categorical values
    Domain,
    /// Numeric values outside declared bounds
    Range,
    /// Row count outside plausible bounds
    Cardinality,
    /// Candidate distribution diverges from the reference
    Drift,
}

/// Why a single check failed, with the observed and expected values
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum Violation {
    #[error("expected columns {expected:?}, got {actual:?}")]
    Schema {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("required column '{column}' is missing")]
    MissingColumn { column: String },

    #[error("column '{column}' has unexpected values {unexpected:?} and is missing {missing:?}")]
    Domain {
        column: String,
        unexpected: Vec<String>,
        missing: Vec<String>,
    },

    #[error("{count} record(s) with {field} outside [{lower}, {upper}]")]
    Range {
        field: String,
        count: usize,
        lower: f64,
        upper: f64,
    },

    #[error("{count} record(s) outside longitude {longitude:?} / latitude {latitude:?}")]
    Geography {
        count: usize,
        longitude: [f64; 2],
        latitude: [f64; 2],
    },

    #[error("row count {rows} outside the open interval ({min_exclusive}, {max_exclusive})")]
    Cardinality {
        rows: usize,
        min_exclusive: usize,
        max_exclusive: usize,
    },

    #[error("KL divergence {divergence} is not below threshold {threshold}")]
    Drift { divergence: f64, threshold: f64 },
}

impl Violation {
    pub fn kind(&self) -> ViolationKind {
        match self {
            Violation::Schema { .. } | Violation::MissingColumn { .. } => ViolationKind::Schema,
            Violation::Domain { .. } => ViolationKind::Domain,
            Violation::Range { .. } | Violation::Geography { .. } => ViolationKind::Range,
            Violation::Cardinality { .. } => ViolationKind::Cardinality,
            Violation::Drift { .. } => ViolationKind::Drift,
        }
    }
}

/// Outcome of one check: it either passes silently or fails with a violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "violation", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail(Violation),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Verdict::Pass => None,
            Verdict::Fail(v) => Some(v),
        }
    }
}

impl From<Result<(), Violation>> for Verdict {
    fn from(result: Result<(), Violation>) -> Self {
        match result {
            Ok(()) => Verdict::Pass,
            Err(v) => Verdict::Fail(v),
        }
    }
}

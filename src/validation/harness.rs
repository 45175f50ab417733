use super::checks;
use super::violation::Verdict;
use super::{CheckId, CheckParameters};
use crate::dataset::Dataset;
use crate::error::{PipelineError, Result};
use crate::observability::metrics;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Result of running one check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutcome {
    pub check: CheckId,
    pub verdict: Verdict,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.verdict.is_pass()
    }
}

/// Receives every outcome as the validator produces it
pub trait CheckReporter: Send + Sync {
    fn report(&self, outcome: &CheckOutcome);

    /// Called for a check that could not run, e.g. drift without a reference
    fn skipped(&self, _check: CheckId, _reason: &str) {}
}

/// Reporter that forwards outcomes to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl CheckReporter for TracingReporter {
    fn report(&self, outcome: &CheckOutcome) {
        match &outcome.verdict {
            Verdict::Pass => info!(check = %outcome.check, "✅ check passed"),
            Verdict::Fail(violation) => error!(
                check = %outcome.check,
                kind = ?violation.kind(),
                "❌ check failed: {}",
                violation
            ),
        }
    }

    fn skipped(&self, check: CheckId, reason: &str) {
        warn!(check = %check, "⏭️ check skipped: {}", reason);
    }
}

/// Reporter that keeps outcomes in memory for later inspection
#[derive(Debug, Default)]
pub struct MemoryReporter {
    outcomes: Mutex<Vec<CheckOutcome>>,
    skipped: Mutex<Vec<CheckId>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> Vec<CheckOutcome> {
        self.outcomes
            .lock()
            .map(|o| o.clone())
            .unwrap_or_default()
    }

    pub fn skipped_checks(&self) -> Vec<CheckId> {
        self.skipped.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl CheckReporter for MemoryReporter {
    fn report(&self, outcome: &CheckOutcome) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push(outcome.clone());
        }
    }

    fn skipped(&self, check: CheckId, _reason: &str) {
        if let Ok(mut skipped) = self.skipped.lock() {
            skipped.push(check);
        }
    }
}

/// Every outcome of one validation run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub outcomes: Vec<CheckOutcome>,
    pub skipped: Vec<CheckId>,
}

impl ValidationReport {
    /// True when every check that ran passed
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(CheckOutcome::passed)
    }

    pub fn failures(&self) -> Vec<&CheckOutcome> {
        self.outcomes.iter().filter(|o| !o.passed()).collect()
    }

    pub fn outcome(&self, check: CheckId) -> Option<&CheckOutcome> {
        self.outcomes.iter().find(|o| o.check == check)
    }

    pub fn summary(&self) -> String {
        let failed = self.failures().len();
        format!(
            "{} check(s) run: {} passed, {} failed, {} skipped",
            self.outcomes.len(),
            self.outcomes.len() - failed,
            failed,
            self.skipped.len()
        )
    }

    /// Turn a failing report into a pipeline-halting error
    pub fn into_result(self) -> Result<ValidationReport> {
        let failed: Vec<String> = self
            .failures()
            .iter()
            .map(|o| o.check.to_string())
            .collect();
        if failed.is_empty() {
            Ok(self)
        } else {
            Err(PipelineError::ValidationFailed {
                failed: failed.len(),
                checks: failed,
            })
        }
    }
}

/// Runs the fixed battery of data checks against a candidate dataset
pub struct DataValidator {
    params: CheckParameters,
    reporter: Arc<dyn CheckReporter>,
}

impl DataValidator {
    pub fn new(params: CheckParameters, reporter: Arc<dyn CheckReporter>) -> Self {
        Self { params, reporter }
    }

    /// Validator that logs outcomes through `tracing`
    pub fn with_tracing(params: CheckParameters) -> Self {
        Self::new(params, Arc::new(TracingReporter))
    }

    pub fn params(&self) -> &CheckParameters {
        &self.params
    }

    /// Run every check. Nothing short-circuits, so one run surfaces every
    /// violation; the drift check is skipped when no reference is given.
    pub fn validate(&self, data: &Dataset, reference: Option<&Dataset>) -> ValidationReport {
        let mut report = ValidationReport::default();

        for check in CheckId::ALL {
            match self.run_check(check, data, reference) {
                Some(verdict) => {
                    let outcome = CheckOutcome { check, verdict };
                    metrics::data_check::check_completed(check.as_str(), outcome.passed());
                    self.reporter.report(&outcome);
                    report.outcomes.push(outcome);
                }
                None => {
                    self.reporter.skipped(check, "no reference dataset supplied");
                    report.skipped.push(check);
                }
            }
        }

        info!("{}", report.summary());
        report
    }

    /// Run a single check in isolation.
    ///
    /// Returns `None` only for the drift check when `reference` is absent.
    pub fn run_check(
        &self,
        check: CheckId,
        data: &Dataset,
        reference: Option<&Dataset>,
    ) -> Option<Verdict> {
        let verdict = match check {
            CheckId::ColumnNames => checks::check_column_names(data),
            CheckId::NeighbourhoodNames => checks::check_neighbourhood_names(data),
            CheckId::ProperBoundaries => checks::check_proper_boundaries(data),
            CheckId::SimilarNeighDistrib => {
                match checks::neighbourhood_divergence(data, reference?) {
                    Ok(divergence) => {
                        metrics::data_check::kl_divergence_observed(divergence);
                        checks::drift_verdict(divergence, self.params.kl_threshold)
                    }
                    Err(violation) => Verdict::Fail(violation),
                }
            }
            CheckId::RowCount => checks::check_row_count(data),
            CheckId::PriceRange => {
                checks::check_price_range(data, self.params.min_price, self.params.max_price)
            }
        };
        Some(verdict)
    }
}

//! Simple metrics module for the pipeline
//!
//! This module provides a straightforward API for recording metrics using
//! the standard Prometheus naming conventions. Recording is a no-op until
//! [`init`] installs the Prometheus recorder.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Instant;
use tracing::info;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Data check metrics
    ChecksPassed,
    ChecksFailed,
    KlDivergence,

    // Stage metrics
    StageRuns,
    StageFailures,
    StageDuration,

    // Cleaning metrics
    RowsCleaned,
    RowsDropped,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ChecksPassed => "pipeline_checks_passed_total",
            MetricName::ChecksFailed => "pipeline_checks_failed_total",
            MetricName::KlDivergence => "pipeline_kl_divergence",
            MetricName::StageRuns => "pipeline_stage_runs_total",
            MetricName::StageFailures => "pipeline_stage_failures_total",
            MetricName::StageDuration => "pipeline_stage_duration_seconds",
            MetricName::RowsCleaned => "pipeline_rows_cleaned_total",
            MetricName::RowsDropped => "pipeline_rows_dropped_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    let _ = METRICS_HANDLE.set(handle);
    info!("Metrics system initialized");
    Ok(())
}

/// Current metrics in the Prometheus text format, if the recorder is installed
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Write the current Prometheus snapshot to `path`
pub fn write_snapshot(path: &Path) -> std::io::Result<bool> {
    match render() {
        Some(text) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, text)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// A timing guard that records the elapsed stage duration when dropped
pub struct TimingGuard {
    start: Instant,
    stage: &'static str,
}

impl TimingGuard {
    pub fn new(stage: &'static str) -> Self {
        Self {
            start: Instant::now(),
            stage,
        }
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        ::metrics::histogram!(MetricName::StageDuration.as_str(), "stage" => self.stage)
            .record(duration);
    }
}

// ============================================================================
// Data Check Metrics
// ============================================================================

pub mod data_check {
    use super::MetricName;

    /// Record the verdict of one check
    pub fn check_completed(check: &'static str, passed: bool) {
        let metric = if passed {
            MetricName::ChecksPassed
        } else {
            MetricName::ChecksFailed
        };
        ::metrics::counter!(metric.as_str(), "check" => check).increment(1);
    }

    /// Record the borough KL divergence of the last drift check
    pub fn kl_divergence_observed(divergence: f64) {
        ::metrics::gauge!(MetricName::KlDivergence.as_str()).set(divergence);
    }
}

// ============================================================================
// Stage Metrics
// ============================================================================

pub mod stage {
    use super::{MetricName, TimingGuard};

    /// Count a stage start and time it until the guard drops
    pub fn started(stage: &'static str) -> TimingGuard {
        ::metrics::counter!(MetricName::StageRuns.as_str(), "stage" => stage).increment(1);
        TimingGuard::new(stage)
    }

    pub fn failed(stage: &'static str) {
        ::metrics::counter!(MetricName::StageFailures.as_str(), "stage" => stage).increment(1);
    }
}

// ============================================================================
// Cleaning Metrics
// ============================================================================

pub mod cleaning {
    use super::MetricName;

    pub fn rows_processed(kept: usize, dropped: usize) {
        ::metrics::counter!(MetricName::RowsCleaned.as_str()).increment(kept as u64);
        ::metrics::counter!(MetricName::RowsDropped.as_str()).increment(dropped as u64);
    }
}

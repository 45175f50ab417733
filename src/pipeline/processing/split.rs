use crate::dataset::{Dataset, Value};
use crate::error::{PipelineError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use tracing::info;

/// How to hold out the test partition
#[derive(Debug, Clone, PartialEq)]
pub struct SplitParameters {
    /// Fraction of rows held out for testing, in (0, 1)
    pub test_size: f64,
    pub random_seed: u64,
    /// Column whose value proportions are preserved in both partitions
    pub stratify_by: Option<String>,
}

impl SplitParameters {
    /// `stratify_by = "none"` disables stratification
    pub fn new(test_size: f64, random_seed: u64, stratify_by: &str) -> Self {
        let stratify_by = match stratify_by.trim() {
            "" | "none" => None,
            column => Some(column.to_string()),
        };
        Self {
            test_size,
            random_seed,
            stratify_by,
        }
    }
}

/// Split `data` into (trainval, test) with a seeded shuffle.
///
/// The same seed and input always yield the same partitions.
pub fn train_test_split(data: &Dataset, params: &SplitParameters) -> Result<(Dataset, Dataset)> {
    if !(params.test_size > 0.0 && params.test_size < 1.0) {
        return Err(PipelineError::InvalidParameters(format!(
            "test_size must lie in (0, 1), got {}",
            params.test_size
        )));
    }

    let groups = match &params.stratify_by {
        Some(column) => {
            let column = data.column(column).ok_or_else(|| {
                PipelineError::Dataset(format!("cannot stratify by missing column '{}'", column))
            })?;
            group_by_value(&column.values)
        }
        None => vec![(0..data.row_count()).collect()],
    };

    let mut rng = StdRng::seed_from_u64(params.random_seed);
    let mut trainval = Vec::new();
    let mut test = Vec::new();
    for mut indices in groups {
        indices.shuffle(&mut rng);
        // the epsilon keeps float noise such as 30 * 0.1 = 3.0000000000000004 from rounding up
        let n_test = ((indices.len() as f64) * params.test_size - 1e-9).ceil() as usize;
        let n_test = n_test.min(indices.len());
        test.extend_from_slice(&indices[..n_test]);
        trainval.extend_from_slice(&indices[n_test..]);
    }

    info!(
        "Split {} rows into {} trainval / {} test",
        data.row_count(),
        trainval.len(),
        test.len()
    );
    Ok((data.take_rows(&trainval)?, data.take_rows(&test)?))
}

/// Row indices grouped by cell value, groups in sorted key order
fn group_by_value(values: &[Value]) -> Vec<Vec<usize>> {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, value) in values.iter().enumerate() {
        groups.entry(value.to_string()).or_default().push(index);
    }
    groups.into_values().collect()
}

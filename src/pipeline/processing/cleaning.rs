use crate::constants::{
    HOST_NAME_COLUMN, LAST_REVIEW_COLUMN, MISSING_NAME_PLACEHOLDER, NAME_COLUMN, PRICE_COLUMN,
};
use crate::dataset::{Dataset, Value};
use crate::error::{PipelineError, Result};
use crate::observability::metrics;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

/// Date layouts accepted for `last_review`, tried in order
const REVIEW_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// What a cleaning pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningSummary {
    pub input_rows: usize,
    pub kept_rows: usize,
    pub dropped_rows: usize,
    pub names_filled: usize,
    pub host_names_filled: usize,
    pub unparsed_dates: usize,
}

/// Apply the fixed cleaning filters and return the cleaned copy.
///
/// - drops listings whose price is outside `[min_price, max_price]` (or missing)
/// - converts `last_review` to dates; values that do not parse become null
/// - fills missing `name` and `host_name` with a placeholder
pub fn clean(data: &Dataset, min_price: f64, max_price: f64) -> Result<(Dataset, CleaningSummary)> {
    if !(min_price < max_price) {
        return Err(PipelineError::InvalidParameters(format!(
            "min_price ({}) must be below max_price ({})",
            min_price, max_price
        )));
    }
    for required in [PRICE_COLUMN, LAST_REVIEW_COLUMN, NAME_COLUMN, HOST_NAME_COLUMN] {
        if data.column(required).is_none() {
            return Err(PipelineError::Dataset(format!(
                "cannot clean data without a '{}' column",
                required
            )));
        }
    }

    info!("Dropping the outliers outside price range [{}, {}]", min_price, max_price);
    let mask = price_mask(data, min_price, max_price);
    let mut cleaned = data.filter_rows(&mask)?;

    let mut summary = CleaningSummary {
        input_rows: data.row_count(),
        kept_rows: cleaned.row_count(),
        dropped_rows: data.row_count() - cleaned.row_count(),
        ..CleaningSummary::default()
    };

    info!("Converting column {} to date format", LAST_REVIEW_COLUMN);
    if let Some(column) = cleaned.column_mut(LAST_REVIEW_COLUMN) {
        for value in column.values.iter_mut() {
            let converted = to_date(value);
            if converted.is_null() && !value.is_null() {
                summary.unparsed_dates += 1;
            }
            *value = converted;
        }
    }
    if summary.unparsed_dates > 0 {
        warn!(
            "{} {} value(s) could not be parsed and were set to null",
            summary.unparsed_dates, LAST_REVIEW_COLUMN
        );
    }

    summary.names_filled = fill_missing(&mut cleaned, NAME_COLUMN);
    summary.host_names_filled = fill_missing(&mut cleaned, HOST_NAME_COLUMN);
    info!(
        "Filled missing values for columns {} ({}) and {} ({})",
        NAME_COLUMN, summary.names_filled, HOST_NAME_COLUMN, summary.host_names_filled
    );

    metrics::cleaning::rows_processed(summary.kept_rows, summary.dropped_rows);
    Ok((cleaned, summary))
}

fn price_mask(data: &Dataset, min_price: f64, max_price: f64) -> Vec<bool> {
    data.column(PRICE_COLUMN)
        .map(|c| {
            c.values
                .iter()
                .map(|v| v.as_f64().map(|p| p >= min_price && p <= max_price).unwrap_or(false))
                .collect()
        })
        .unwrap_or_default()
}

fn to_date(value: &Value) -> Value {
    match value {
        Value::Date(d) => Value::Date(*d),
        Value::Str(s) => REVIEW_DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s.trim(), fmt).ok())
            // timestamps such as "2019-05-21 00:00:00" keep their date part
            .or_else(|| {
                s.trim()
                    .split_whitespace()
                    .next()
                    .and_then(|d| NaiveDate::parse_from_str(d, REVIEW_DATE_FORMATS[0]).ok())
            })
            .map(Value::Date)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn fill_missing(data: &mut Dataset, column: &str) -> usize {
    let mut filled = 0;
    if let Some(column) = data.column_mut(column) {
        for value in column.values.iter_mut().filter(|v| v.is_null()) {
            *value = Value::from(MISSING_NAME_PLACEHOLDER);
            filled += 1;
        }
    }
    filled
}

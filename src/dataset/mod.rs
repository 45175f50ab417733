//! In-memory tabular datasets.
//!
//! A [`Dataset`] is column-major: an ordered list of named [`Column`]s that all
//! hold the same number of typed [`Value`]s. Operations that select rows always
//! build a new dataset and leave the source untouched.

pub mod csv_io;

pub use csv_io::{read_csv, write_csv};

use crate::error::{PipelineError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

// -2^63 and 2^63, both exactly representable
const I64_MIN_F64: f64 = -9_223_372_036_854_775_808.0;
const I64_MAX_EXCLUSIVE_F64: f64 = 9_223_372_036_854_775_808.0;

/// An integral float that converts to i64 without saturating
fn fits_i64(f: f64) -> bool {
    f.fract() == 0.0 && (I64_MIN_F64..I64_MAX_EXCLUSIVE_F64).contains(&f)
}

/// Declared scalar type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Int,
    Float,
    Str,
    Date,
}

/// A single typed cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Str(String),
}

impl Value {
    /// Parse a raw field according to a declared column type.
    ///
    /// Empty fields are `Null`. A field that does not fit the declared type is
    /// kept as a string so the checks can still report it.
    pub fn parse_as(raw: &str, ty: ColumnType) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        match ty {
            ColumnType::Int => match trimmed.parse::<i64>() {
                Ok(i) => Value::Int(i),
                // integral floats such as "3.0" come out of tools that widen int columns
                Err(_) => match trimmed.parse::<f64>() {
                    Ok(f) if fits_i64(f) => Value::Int(f as i64),
                    _ => Value::Str(raw.to_string()),
                },
            },
            ColumnType::Float => trimmed
                .parse::<f64>()
                .map(Value::Float)
                .unwrap_or_else(|_| Value::Str(raw.to_string())),
            ColumnType::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map(Value::Date)
                .unwrap_or_else(|_| Value::Str(raw.to_string())),
            ColumnType::Str => Value::Str(raw.to_string()),
        }
    }

    /// Parse a field of a column with no declared type
    pub fn infer(raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Value::Null
        } else if let Ok(i) = trimmed.parse::<i64>() {
            Value::Int(i)
        } else if let Ok(f) = trimmed.parse::<f64>() {
            Value::Float(f)
        } else if let Ok(d) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
            Value::Date(d)
        } else {
            Value::Str(raw.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value; integers widen, everything else is `None`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

/// A named column of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An ordered collection of equal-length columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    /// An empty dataset with the given header and no rows
    pub fn with_columns<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            columns: names
                .iter()
                .map(|n| Column::new(n.as_ref(), Vec::new()))
                .collect(),
        }
    }

    /// Build a dataset from columns; every column must have the same length
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(PipelineError::Dataset(format!(
                    "column '{}' has {} values, expected {}",
                    bad.name,
                    bad.len(),
                    expected
                )));
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub(crate) fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Cells of one row in column order
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.row_count() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    /// Append one row; the row must supply a value for every column
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(PipelineError::Dataset(format!(
                "row has {} fields, expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.values.push(value);
        }
        Ok(())
    }

    /// Keep the rows whose mask entry is `true`
    pub fn filter_rows(&self, mask: &[bool]) -> Result<Dataset> {
        if mask.len() != self.row_count() {
            return Err(PipelineError::Dataset(format!(
                "row mask has {} entries for {} rows",
                mask.len(),
                self.row_count()
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let values = c
                    .values
                    .iter()
                    .zip(mask)
                    .filter(|(_, keep)| **keep)
                    .map(|(v, _)| v.clone())
                    .collect();
                Column::new(c.name.clone(), values)
            })
            .collect();
        Ok(Dataset { columns })
    }

    /// Select rows by index, in the given order
    pub fn take_rows(&self, indices: &[usize]) -> Result<Dataset> {
        let rows = self.row_count();
        if let Some(bad) = indices.iter().find(|i| **i >= rows) {
            return Err(PipelineError::Dataset(format!(
                "row index {} out of bounds for {} rows",
                bad, rows
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let values = indices.iter().map(|i| c.values[*i].clone()).collect();
                Column::new(c.name.clone(), values)
            })
            .collect();
        Ok(Dataset { columns })
    }
}

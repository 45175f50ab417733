use super::{Column, Dataset, Value};
use crate::constants;
use crate::error::Result;
use std::path::Path;
use tracing::debug;

/// Read a CSV file with a header row into a [`Dataset`].
///
/// Columns belonging to the listing schema are parsed with their declared type;
/// any other column is inferred cell by cell.
pub fn read_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    read_from(&mut reader, path)
}

fn read_from<R: std::io::Read>(reader: &mut csv::Reader<R>, path: &Path) -> Result<Dataset> {
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let types: Vec<_> = headers.iter().map(|h| constants::declared_type(h)).collect();
    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];

    for record in reader.records() {
        let record = record?;
        for ((field, ty), values) in record.iter().zip(&types).zip(columns.iter_mut()) {
            let value = match ty {
                Some(ty) => Value::parse_as(field, *ty),
                None => Value::infer(field),
            };
            values.push(value);
        }
    }

    let dataset = Dataset::from_columns(
        headers
            .into_iter()
            .zip(columns)
            .map(|(name, values)| Column::new(name, values))
            .collect(),
    )?;
    debug!(
        "Read {} rows x {} columns from {}",
        dataset.row_count(),
        dataset.columns().len(),
        path.display()
    );
    Ok(dataset)
}

/// Write a dataset as CSV with a header row and no index column
pub fn write_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(dataset.column_names())?;
    for index in 0..dataset.row_count() {
        let fields: Vec<String> = dataset
            .columns()
            .iter()
            .map(|c| c.values[index].to_string())
            .collect();
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    debug!("Wrote {} rows to {}", dataset.row_count(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    const SAMPLE: &str = "\
id,name,neighbourhood_group,price,last_review,extra
2539,Clean & quiet apt,Brooklyn,149,2018-10-19,1.5
2595,,Manhattan,225,,x
";

    #[test]
    fn test_reads_declared_and_inferred_types() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let data = read_csv(&path).unwrap();
        assert_eq!(
            data.column_names(),
            vec!["id", "name", "neighbourhood_group", "price", "last_review", "extra"]
        );
        assert_eq!(data.row_count(), 2);
        assert_eq!(data.column("id").unwrap().values[0], Value::Int(2539));
        assert_eq!(data.column("price").unwrap().values[1], Value::Float(225.0));
        assert_eq!(data.column("name").unwrap().values[1], Value::Null);
        assert_eq!(
            data.column("last_review").unwrap().values[0],
            Value::Date(NaiveDate::from_ymd_opt(2018, 10, 19).unwrap())
        );
        assert_eq!(data.column("extra").unwrap().values[0], Value::Float(1.5));
        assert_eq!(data.column("extra").unwrap().values[1], Value::from("x"));
    }

    #[test]
    fn test_write_then_read_preserves_cells() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("nested").join("out.csv");
        std::fs::write(&input, SAMPLE).unwrap();

        let data = read_csv(&input).unwrap();
        write_csv(&data, &output).unwrap();
        let reread = read_csv(&output).unwrap();
        assert_eq!(data, reread);
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "a,b\n1,2\n3\n").unwrap();
        assert!(read_csv(&path).is_err());
    }
}

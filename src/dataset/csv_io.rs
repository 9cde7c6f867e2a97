//! Flat CSV files: one header row, one numeric row per record.

use std::path::Path;

use ndarray::{Array1, Array2};

use super::{DatasetError, Table};
use crate::atomic_file::{self, Staged};

/// Write `table` to `path` with the feature columns first and the target last.
pub fn write_table_csv(table: &Table, path: &Path) -> Result<(), DatasetError> {
    stage_table_csv(table, path)?
        .commit()
        .map_err(|source| DatasetError::io(path, source))
}

/// Write `table` next to `path` without replacing `path` yet.
pub(crate) fn stage_table_csv(table: &Table, path: &Path) -> Result<Staged, DatasetError> {
    atomic_file::stage_with(path, |writer| {
        let mut csv_writer = csv::Writer::from_writer(writer);
        write_rows(&mut csv_writer, table).map_err(std::io::Error::from)?;
        csv_writer.flush()
    })
    .map_err(|source| DatasetError::io(path, source))
}

fn write_rows<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    table: &Table,
) -> Result<(), csv::Error> {
    writer.write_record(table.header())?;
    let features = table.features();
    let target = table.target();
    let mut record = Vec::with_capacity(table.n_features() + 1);
    for (row, &y) in features.rows().into_iter().zip(target.iter()) {
        record.clear();
        record.extend(row.iter().map(|v| v.to_string()));
        record.push(y.to_string());
        writer.write_record(&record)?;
    }
    Ok(())
}

/// Read a CSV written by [`write_table_csv`] (or any all-numeric CSV).
///
/// Every column except `target` becomes a feature, in file order.
pub fn read_table_csv(path: &Path, target: &str) -> Result<Table, DatasetError> {
    let csv_error = |source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;
    let header: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_string)
        .collect();
    if header.is_empty() || header.iter().all(String::is_empty) {
        return Err(DatasetError::MissingHeader {
            path: path.to_path_buf(),
        });
    }
    let target_idx = header
        .iter()
        .position(|name| name == target)
        .ok_or_else(|| DatasetError::MissingColumn {
            path: path.to_path_buf(),
            column: target.to_string(),
        })?;
    let feature_names: Vec<String> = header
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != target_idx)
        .map(|(_, name)| name.clone())
        .collect();

    let mut values: Vec<f64> = Vec::new();
    let mut targets: Vec<f64> = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        for (col_idx, field) in record.iter().enumerate() {
            let value = field.parse::<f64>().map_err(|_| DatasetError::ParseValue {
                path: path.to_path_buf(),
                row: row_idx + 1,
                column: header[col_idx].clone(),
                value: field.to_string(),
            })?;
            if col_idx == target_idx {
                targets.push(value);
            } else {
                values.push(value);
            }
        }
    }
    if targets.is_empty() {
        return Err(DatasetError::Empty {
            path: path.to_path_buf(),
        });
    }

    let features = Array2::from_shape_vec((targets.len(), feature_names.len()), values)
        .map_err(|err| DatasetError::Shape(err.to_string()))?;
    Table::new(
        feature_names,
        target.to_string(),
        features,
        Array1::from(targets),
    )
}

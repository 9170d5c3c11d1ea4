use std::fs::{self, File};
use std::path::Path;

use polars::prelude::*;
use tracing::debug;

use crate::error::{CleaningError, Result};

/// Read a header-delimited CSV file into a dataframe.
///
/// The whole file is scanned for schema inference so a stray non-numeric
/// value deep in the file changes the column type instead of failing halfway.
pub fn read_dataset(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|err| {
            CleaningError::MalformedInput(format!("{} is not a valid CSV file: {err}", path.display()))
        })?;

    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "Parsed dataset"
    );
    Ok(df)
}

pub fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<()> {
    let present = df.get_column_names();
    let missing: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|name| !present.iter().any(|column| column.as_str() == *name))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CleaningError::MalformedInput(format!(
            "dataset is missing required column(s): {}",
            missing.join(", ")
        )))
    }
}

/// Write `df` as CSV with a header row. Datetime columns use `datetime_format`;
/// nulls are written as empty fields.
pub fn write_dataset(df: &mut DataFrame, path: &Path, datetime_format: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_datetime_format(Some(datetime_format.to_string()))
        .finish(df)?;

    debug!(path = %path.display(), rows = df.height(), "Wrote dataset");
    Ok(())
}

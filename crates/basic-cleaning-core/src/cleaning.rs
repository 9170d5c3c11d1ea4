//! Row filtering and column normalization applied to the raw listings table.

use chrono::NaiveTime;
use polars::prelude::*;

use crate::dataset::require_columns;
use crate::dates::parse_permissive;
use crate::error::{CleaningError, Result};

pub const PRICE_COLUMN: &str = "price";
pub const LAST_REVIEW_COLUMN: &str = "last_review";

const DATE_ONLY_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSummary {
    pub parsed: usize,
    pub missing: usize,
    /// Every parsed value falls on midnight.
    pub date_only: bool,
}

impl DateSummary {
    /// Output layout for the normalized column: plain dates when no value
    /// carries a time of day.
    pub fn csv_format(&self) -> &'static str {
        if self.date_only {
            DATE_ONLY_FORMAT
        } else {
            DATETIME_FORMAT
        }
    }
}

#[derive(Debug, Clone)]
pub struct CleanedDataset {
    pub frame: DataFrame,
    pub rows_read: usize,
    pub reviews: DateSummary,
}

impl CleanedDataset {
    pub fn rows_kept(&self) -> usize {
        self.frame.height()
    }
}

/// Drop price outliers, then normalize `last_review`.
pub fn clean(df: DataFrame, min_price: f64, max_price: f64) -> Result<CleanedDataset> {
    require_columns(&df, &[PRICE_COLUMN, LAST_REVIEW_COLUMN])?;

    let rows_read = df.height();
    let mut frame = filter_price_range(df, min_price, max_price)?;
    let reviews = normalize_dates(&mut frame, LAST_REVIEW_COLUMN)?;

    Ok(CleanedDataset {
        frame,
        rows_read,
        reviews,
    })
}

/// Keep rows with `min_price <= price <= max_price`. Rows without a price are
/// dropped; a price that is present but not a number is an error. A text price
/// column is replaced by its parsed values.
pub fn filter_price_range(df: DataFrame, min_price: f64, max_price: f64) -> Result<DataFrame> {
    let prices = numeric_values(&df, PRICE_COLUMN)?;

    let mut df = df;
    if df.column(PRICE_COLUMN)?.dtype() == &DataType::String {
        df.with_column(prices.clone().with_name(PRICE_COLUMN.into()).into_series())?;
    }

    let in_range: BooleanChunked = prices
        .into_iter()
        .map(|price| price.is_some_and(|value| value >= min_price && value <= max_price))
        .collect();

    Ok(df.filter(&in_range)?)
}

/// Column `name` as `f64`. Text values are trimmed before parsing.
fn numeric_values(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let column = df
        .column(name)
        .map_err(|_| CleaningError::MalformedInput(format!("missing column '{name}'")))?;

    match column.dtype() {
        DataType::Float64
        | DataType::Float32
        | DataType::Int64
        | DataType::Int32
        | DataType::UInt64
        | DataType::UInt32
        | DataType::Null => {
            let cast = column.cast(&DataType::Float64)?;
            Ok(cast.as_materialized_series().f64()?.clone())
        }
        DataType::String => {
            let values = column.as_materialized_series().str()?;
            let mut parsed: Vec<Option<f64>> = Vec::with_capacity(values.len());
            for (idx, value) in values.into_iter().enumerate() {
                let Some(raw) = value else {
                    parsed.push(None);
                    continue;
                };
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    parsed.push(None);
                    continue;
                }
                match trimmed.parse::<f64>() {
                    Ok(number) => parsed.push(Some(number)),
                    Err(_) => {
                        return Err(CleaningError::MalformedInput(format!(
                            "column '{name}' has non-numeric value {raw:?} in data row {}",
                            idx + 1
                        )))
                    }
                }
            }
            Ok(Float64Chunked::from_iter_options(name.into(), parsed.into_iter()))
        }
        other => Err(CleaningError::MalformedInput(format!(
            "column '{name}' must be numeric, found {other}"
        ))),
    }
}

/// Replace column `name` with a microsecond datetime column. Values the
/// permissive parser rejects become null.
pub fn normalize_dates(df: &mut DataFrame, name: &str) -> Result<DateSummary> {
    let as_text = df
        .column(name)
        .map_err(|_| CleaningError::MalformedInput(format!("missing column '{name}'")))?
        .cast(&DataType::String)?;
    let values = as_text.as_materialized_series().str()?;

    let mut summary = DateSummary {
        parsed: 0,
        missing: 0,
        date_only: true,
    };
    let mut micros: Vec<Option<i64>> = Vec::with_capacity(values.len());

    for value in values.into_iter() {
        match value.and_then(parse_permissive) {
            Some(parsed) => {
                if parsed.time() != NaiveTime::MIN {
                    summary.date_only = false;
                }
                summary.parsed += 1;
                micros.push(Some(parsed.and_utc().timestamp_micros()));
            }
            None => {
                summary.missing += 1;
                micros.push(None);
            }
        }
    }

    let normalized = Series::new(name.into(), micros)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
    df.with_column(normalized)?;

    Ok(summary)
}

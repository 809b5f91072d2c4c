//! Reading USGS RDB text into Polars frames.
//!
//! An RDB document is tab separated. Lines starting with `#` are comments, the
//! first remaining line names the columns and the line after it holds field
//! width specifiers (`5s`, `15s`, `20d`, ...) that are not data.

use crate::tables::error::TableError;
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::io::Cursor;

pub const DATETIME_COLUMN: &str = "datetime";

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"];

/// Parses an RDB document into a frame of string columns, dropping the
/// width-specifier row.
///
/// Every column is read as text; [`prepare_rdb_frame`] does the typing.
pub fn parse_rdb(bytes: &[u8]) -> PolarsResult<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|options| {
            options
                .with_separator(b'\t')
                .with_comment_prefix(Some("#"))
                // RDB has no quoting, a leading `"` is part of the field
                .with_quote_char(None)
        })
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()?;

    Ok(df.slice(1, df.height().saturating_sub(1)))
}

/// Column names of measured parameters, e.g. `211943_00010`
/// (`<time-series id>_<parameter code>`, plus `_<statistic code>` for daily
/// values). Qualifier columns (`..._cd`) are not included.
pub fn parameter_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .filter(|name| is_parameter_column(name))
        .map(str::to_string)
        .collect()
}

fn is_parameter_column(name: &str) -> bool {
    let parts: Vec<&str> = name.split('_').collect();
    let all_digits = parts
        .iter()
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
    // `<ts id>_<pcode>` for instantaneous values, `<ts id>_<pcode>_<stat>` for daily values
    all_digits && matches!(parts.len(), 2 | 3) && parts[1..].iter().all(|part| part.len() == 5)
}

/// Types a frame returned by [`parse_rdb`]: `datetime` becomes a
/// `Datetime(ms)` column and every parameter column becomes `Float64`.
///
/// Values the service reports as text markers (`Ice`, `Eqp`, `Ssn`, ...) turn
/// into nulls.
pub fn prepare_rdb_frame(mut df: DataFrame) -> Result<DataFrame, TableError> {
    let datetime = parse_datetime_column(&df)?;
    df.with_column(datetime)?;

    for name in parameter_columns(&df) {
        let numeric = df.column(&name)?.cast(&DataType::Float64)?;
        df.with_column(numeric)?;
    }
    Ok(df)
}

fn parse_datetime_column(df: &DataFrame) -> Result<Column, TableError> {
    let raw = df
        .column(DATETIME_COLUMN)
        .map_err(|_| TableError::MissingColumn(DATETIME_COLUMN.to_string()))?
        .str()?;

    let millis = raw
        .into_iter()
        .map(|value| value.map(parse_rdb_datetime).transpose())
        .collect::<Result<Vec<Option<i64>>, TableError>>()?;

    let column = Column::new(DATETIME_COLUMN.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    Ok(column)
}

fn parse_rdb_datetime(value: &str) -> Result<i64, TableError> {
    let value = value.trim();
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(datetime.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(Default::default()).and_utc().timestamp_millis())
        .map_err(|source| TableError::InvalidTimestamp {
            value: value.to_string(),
            source,
        })
}

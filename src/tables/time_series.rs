//! Flattens a WaterML-JSON time series into a plot-ready frame.

use crate::tables::error::TableError;
use crate::types::water_ml::{TimeSeries, WaterMlResponse};
use chrono::DateTime;
use polars::prelude::*;

pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const VALUE_COLUMN: &str = "value";

/// Builds a frame with one row per reading of the series at `index`, taken
/// from its value set at `method_index`. A series carries one value set per
/// sensor or method; sets are never merged.
///
/// Columns, in order: `timestamp` (UTC, `Datetime(ms)`), `value` (`Float64`,
/// null where the service reported its no-data sentinel or a non-numeric
/// value), `units`, `qualifiers` (comma separated), `site_name`, `site_code`
/// and `variable_code`.
///
/// # Errors
///
/// * [`TableError::NoTimeSeries`] if the response is empty.
/// * [`TableError::SeriesOutOfRange`] if `index` is past the last series.
/// * [`TableError::MethodOutOfRange`] if `method_index` is past the last value set.
/// * [`TableError::MissingSiteCode`] if the series lists no site code.
/// * [`TableError::NoValues`] if the series carries no readings.
/// * [`TableError::InvalidTimestamp`] if a `dateTime` is not RFC 3339.
pub fn time_series_frame(
    response: &WaterMlResponse,
    index: usize,
    method_index: usize,
) -> Result<DataFrame, TableError> {
    let all_series = &response.value.time_series;
    if all_series.is_empty() {
        return Err(TableError::NoTimeSeries);
    }
    let series = all_series
        .get(index)
        .ok_or(TableError::SeriesOutOfRange {
            index,
            available: all_series.len(),
        })?;
    series_frame(series, method_index)
}

fn series_frame(series: &TimeSeries, method_index: usize) -> Result<DataFrame, TableError> {
    let site_code = series
        .site_code()
        .ok_or_else(|| TableError::MissingSiteCode {
            series: series.name.clone().unwrap_or_default(),
        })?;

    let observations = match series.values.get(method_index) {
        Some(set) => &set.value,
        // a series without any value set simply has no readings
        None if series.values.is_empty() => {
            return Err(TableError::NoValues {
                site: site_code.to_string(),
            })
        }
        None => {
            return Err(TableError::MethodOutOfRange {
                index: method_index,
                available: series.values.len(),
            })
        }
    };
    if observations.is_empty() {
        return Err(TableError::NoValues {
            site: site_code.to_string(),
        });
    }

    let no_data = series.variable.no_data_value;
    let mut timestamps = Vec::with_capacity(observations.len());
    let mut values = Vec::with_capacity(observations.len());
    let mut qualifiers = Vec::with_capacity(observations.len());
    for observation in observations {
        let timestamp = DateTime::parse_from_rfc3339(&observation.date_time).map_err(|source| {
            TableError::InvalidTimestamp {
                value: observation.date_time.clone(),
                source,
            }
        })?;
        timestamps.push(timestamp.timestamp_millis());
        values.push(
            observation
                .value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| Some(*v) != no_data),
        );
        qualifiers.push(observation.qualifiers.join(","));
    }

    let height = observations.len();
    let repeat = |value: &str| vec![value.to_string(); height];

    let df = DataFrame::new(vec![
        Column::new(TIMESTAMP_COLUMN.into(), timestamps)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
        Column::new(VALUE_COLUMN.into(), values),
        Column::new("units".into(), repeat(&series.variable.unit.unit_code)),
        Column::new("qualifiers".into(), qualifiers),
        Column::new("site_name".into(), repeat(&series.source_info.site_name)),
        Column::new("site_code".into(), repeat(site_code)),
        Column::new(
            "variable_code".into(),
            repeat(series.variable_code().unwrap_or_default()),
        ),
    ])?;
    Ok(df)
}

/// Mean of the non-null entries of a `Float64` column, `None` if there are none.
pub fn mean_value(df: &DataFrame, column: &str) -> Result<Option<f64>, TableError> {
    let values = df
        .column(column)
        .map_err(|_| TableError::MissingColumn(column.to_string()))?
        .f64()?;
    Ok(values.mean())
}

use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Response contains no time series")]
    NoTimeSeries,

    #[error("Time series index {index} out of range, response has {available}")]
    SeriesOutOfRange { index: usize, available: usize },

    #[error("Value set index {index} out of range, series has {available}")]
    MethodOutOfRange { index: usize, available: usize },

    #[error("Time series for site '{site}' has no values")]
    NoValues { site: String },

    #[error("Time series '{series}' lists no site code")]
    MissingSiteCode { series: String },

    #[error("Could not parse timestamp '{value}'")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Required column '{0}' not found in DataFrame")]
    MissingColumn(String),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}

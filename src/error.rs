use crate::tables::error::TableError;
use crate::water_data::error::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WaterDataError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Failed to determine cache directory")]
    CacheDirResolution,

    #[error("No data could be retrieved from {url}")]
    NoData { url: String },
}

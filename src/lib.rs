mod cache;
mod error;
mod tables;
mod types;
mod utils;
mod water_data;
mod waterdata;

pub use error::WaterDataError;
pub use waterdata::*;

pub use cache::key::{derive_cache_key, CacheLocation};

pub use types::request::*;
pub use types::water_ml::*;

pub use water_data::cached_fetcher::CachedFetcher;
pub use water_data::error::{BoxError, DecodeError, FetchError, TransportError};
pub use water_data::format::{Ingested, JsonFormat, RdbFormat, ResponseFormat};
pub use water_data::transport::{HttpResponse, HttpTransport, ReqwestTransport};

pub use tables::error::TableError;
pub use tables::rdb::{parameter_columns, parse_rdb, prepare_rdb_frame, DATETIME_COLUMN};
pub use tables::time_series::{mean_value, time_series_frame, TIMESTAMP_COLUMN, VALUE_COLUMN};

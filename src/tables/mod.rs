pub mod error;
pub mod rdb;
pub mod time_series;

pub mod cached_fetcher;
pub mod error;
pub mod format;
pub mod transport;

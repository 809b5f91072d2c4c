//! Format strategies for [`crate::CachedFetcher`].
//!
//! A format decides how cached bytes are decoded and what is written to the
//! cache for a fresh response body.

use crate::tables::rdb::parse_rdb;
use crate::types::request::DataFormat;
use crate::water_data::error::DecodeError;
use polars::frame::DataFrame;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// A fresh network body, prepared for the cache.
pub struct Ingested<P> {
    /// Bytes to write to the cache file.
    pub cache_bytes: Vec<u8>,
    /// The payload, when preparing the bytes already produced it. `None` means
    /// the fetcher decodes `cache_bytes` after persisting them.
    pub payload: Option<P>,
}

pub trait ResponseFormat: Send + Sync + 'static {
    type Payload: Send + 'static;

    const FORMAT: DataFormat;

    /// Decodes the contents of a cache file.
    fn decode(bytes: &[u8]) -> Result<Self::Payload, DecodeError>;

    /// Turns a 2xx response body into what gets cached. Failing here means the
    /// response is unusable and nothing is written.
    fn ingest(body: Vec<u8>) -> Result<Ingested<Self::Payload>, DecodeError>;
}

/// JSON documents, decoded into `T`.
///
/// The cache holds the whole response re-encoded with 4-space indentation, so
/// fields that `T` does not model are kept on disk.
pub struct JsonFormat<T = serde_json::Value>(PhantomData<fn() -> T>);

impl<T> ResponseFormat for JsonFormat<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Payload = T;

    const FORMAT: DataFormat = DataFormat::Json;

    fn decode(bytes: &[u8]) -> Result<T, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn ingest(body: Vec<u8>) -> Result<Ingested<T>, DecodeError> {
        let document: serde_json::Value = serde_json::from_slice(&body)?;
        let cache_bytes = to_pretty_json(&document)?;
        let payload = serde_json::from_value(document)?;
        Ok(Ingested {
            cache_bytes,
            payload: Some(payload),
        })
    }
}

fn to_pretty_json(document: &serde_json::Value) -> Result<Vec<u8>, DecodeError> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    document
        .serialize(&mut serializer)
        .map_err(DecodeError::JsonEncode)?;
    Ok(buffer)
}

/// USGS RDB tables, decoded into a string-typed [`DataFrame`] without the
/// width-specifier row. The cache holds the response byte for byte.
pub struct RdbFormat;

impl ResponseFormat for RdbFormat {
    type Payload = DataFrame;

    const FORMAT: DataFormat = DataFormat::Rdb;

    fn decode(bytes: &[u8]) -> Result<DataFrame, DecodeError> {
        parse_rdb(bytes).map_err(DecodeError::Rdb)
    }

    fn ingest(body: Vec<u8>) -> Result<Ingested<DataFrame>, DecodeError> {
        Ok(Ingested {
            cache_bytes: body,
            payload: None,
        })
    }
}

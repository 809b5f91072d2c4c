use crate::utils::ensure_cache_dir_exists;
use crate::water_data::error::FetchError;
use crate::water_data::format::{Ingested, ResponseFormat};
use crate::water_data::transport::HttpTransport;
use log::{error, info, warn};
use std::error::Error;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::{fs, task};

/// Returns a response from the disk cache when a readable copy exists, and
/// otherwise downloads it, caches it and returns it.
///
/// `F` decides how bytes are decoded and what is cached, `T` performs the GET.
/// Each call runs start to finish on its own: two callers missing the same
/// cache file at the same time both download it, and the last one to finish
/// writing wins. Writes go through a temporary file in the same directory and
/// are renamed into place, so a cache file is never observed half written.
pub struct CachedFetcher<F, T> {
    transport: Arc<T>,
    _format: PhantomData<fn() -> F>,
}

impl<F, T> CachedFetcher<F, T>
where
    F: ResponseFormat,
    T: HttpTransport,
{
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            _format: PhantomData,
        }
    }

    /// Like [`Self::try_fetch`], but logs the failure and returns `None`
    /// instead of an error.
    pub async fn fetch(&self, url: &str, cache_path: &Path) -> Option<F::Payload> {
        match self.try_fetch(url, cache_path).await {
            Ok(payload) => Some(payload),
            Err(e) => {
                error!("Failed to retrieve {}: {}", url, error_chain(&e));
                None
            }
        }
    }

    /// Loads `url` through the cache file at `cache_path`.
    ///
    /// A cache file that cannot be read or decoded is logged and replaced by a
    /// fresh download; it never causes an error on its own.
    ///
    /// # Errors
    ///
    /// * [`FetchError::Network`] if the request gets no response.
    /// * [`FetchError::HttpStatus`] if the response is not 2xx. Nothing is cached.
    /// * [`FetchError::Decode`] if a 2xx body is not valid for the format.
    /// * [`FetchError::CacheDirCreation`], [`FetchError::CacheWrite`] or
    ///   [`FetchError::CachePersist`] if the response cannot be stored.
    pub async fn try_fetch(&self, url: &str, cache_path: &Path) -> Result<F::Payload, FetchError> {
        if fs::metadata(cache_path).await.is_ok() {
            info!(
                "Cache hit for {} data, loading {}",
                F::FORMAT,
                cache_path.display()
            );
            match Self::load_cached(cache_path).await {
                Ok(payload) => return Ok(payload),
                Err(e) => warn!(
                    "Could not read cache file {}, refetching: {}",
                    cache_path.display(),
                    error_chain(&e)
                ),
            }
        } else {
            info!("Cache miss for {}, fetching from the API", url);
        }

        let body = self.download(url).await?;
        let Ingested {
            cache_bytes,
            payload,
        } = task::spawn_blocking(move || F::ingest(body))
            .await?
            .map_err(|source| FetchError::Decode {
                url: url.to_string(),
                source,
            })?;

        let cache_bytes = Self::persist(cache_path, cache_bytes).await?;
        info!(
            "Saved {} bytes to cache file {}",
            cache_bytes.len(),
            cache_path.display()
        );

        match payload {
            Some(payload) => Ok(payload),
            None => task::spawn_blocking(move || F::decode(&cache_bytes))
                .await?
                .map_err(|source| FetchError::Decode {
                    url: url.to_string(),
                    source,
                }),
        }
    }

    async fn load_cached(cache_path: &Path) -> Result<F::Payload, FetchError> {
        let bytes = fs::read(cache_path)
            .await
            .map_err(|e| FetchError::CacheRead(cache_path.to_path_buf(), e))?;
        let path = cache_path.to_path_buf();
        task::spawn_blocking(move || F::decode(&bytes).map_err(|e| FetchError::CacheDecode(path, e)))
            .await?
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.transport.get(url).await?;
        if !response.status.is_success() {
            warn!("HTTP error for {}: {}", url, response.status);
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }
        info!("Downloaded {} bytes from {}", response.body.len(), url);
        Ok(response.body)
    }

    /// Writes `bytes` to `path` via a sibling temp file, creating parent
    /// directories as needed. Hands the bytes back for decoding.
    async fn persist(path: &Path, bytes: Vec<u8>) -> Result<Vec<u8>, FetchError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        ensure_cache_dir_exists(&parent).await?;

        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            let mut temp_file = NamedTempFile::new_in(&parent)
                .map_err(|e| FetchError::CacheWrite(path_buf.clone(), e))?;
            temp_file
                .write_all(&bytes)
                .map_err(|e| FetchError::CacheWrite(path_buf.clone(), e))?;
            temp_file
                .flush()
                .map_err(|e| FetchError::CacheWrite(path_buf.clone(), e))?;
            temp_file
                .persist(&path_buf)
                .map_err(|e| FetchError::CachePersist(path_buf.clone(), e.error))?;
            Ok::<_, FetchError>(bytes)
        })
        .await?
    }
}

fn error_chain(e: &dyn Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::derive_cache_key;
    use crate::tables::rdb::fixtures::IV_RDB;
    use crate::types::water_ml::fixtures::IV_DISCHARGE_JSON;
    use crate::types::water_ml::WaterMlResponse;
    use crate::water_data::format::{JsonFormat, RdbFormat};
    use crate::water_data::transport::mock::MockTransport;
    use reqwest::StatusCode;
    use tempfile::TempDir;

    const URL: &str =
        "https://waterservices.usgs.gov/nwis/iv/?format=json&sites=09163500&period=P365D&siteStatus=all";
    const SMALL_RDB: &str = "# retrieved: 2024-05-01\nA\tB\n8s\t8s\n1\tx\n2\ty\n";

    fn json_path(dir: &TempDir) -> PathBuf {
        dir.path().join(format!("{}.json", derive_cache_key(URL)))
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .map(|entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_miss_creates_one_file_matching_body() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let transport = Arc::new(MockTransport::ok(r#"{"value":{"timeSeries":[]}}"#));
        let fetcher = CachedFetcher::<JsonFormat, _>::new(transport.clone());
        let path = json_path(&dir);

        let payload = fetcher.fetch(URL, &path).await.ok_or("expected payload")?;

        let expected: serde_json::Value = serde_json::from_str(r#"{"value":{"timeSeries":[]}}"#)?;
        assert_eq!(payload, expected);
        assert_eq!(files_in(dir.path()), vec![path.clone()]);
        let on_disk: serde_json::Value = serde_json::from_slice(&std::fs::read(&path)?)?;
        assert_eq!(on_disk, expected);
        assert_eq!(transport.urls(), vec![URL.to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_hit_skips_network() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let transport = Arc::new(MockTransport::ok(IV_DISCHARGE_JSON));
        let fetcher = CachedFetcher::<JsonFormat<WaterMlResponse>, _>::new(transport.clone());
        let path = json_path(&dir);

        let fresh = fetcher.fetch(URL, &path).await.ok_or("expected payload")?;
        let cached = fetcher.fetch(URL, &path).await.ok_or("expected payload")?;

        assert_eq!(fresh, cached);
        assert_eq!(transport.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_server_error_returns_none_and_caches_nothing() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let transport = Arc::new(MockTransport::with_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            "upstream exploded",
        ));
        let fetcher = CachedFetcher::<JsonFormat, _>::new(transport.clone());
        let path = dir.path().join("cache").join("entry.json");

        assert!(fetcher.fetch(URL, &path).await.is_none());
        assert!(!path.exists());
        assert!(!dir.path().join("cache").exists());

        let err = fetcher.try_fetch(URL, &path).await.err().ok_or("expected error")?;
        assert!(matches!(
            err,
            FetchError::HttpStatus { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
        assert_eq!(transport.calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_transport_failure_returns_none() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let transport = Arc::new(MockTransport::unreachable("connection refused"));
        let fetcher = CachedFetcher::<RdbFormat, _>::new(transport);
        let path = dir.path().join("sites.rdb");

        assert!(fetcher.fetch(URL, &path).await.is_none());
        assert!(matches!(
            fetcher.try_fetch(URL, &path).await,
            Err(FetchError::Network(_))
        ));
        assert!(files_in(dir.path()).is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_json_cache_is_refetched_and_overwritten() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let path = json_path(&dir);
        std::fs::write(&path, "{\"value\": {\"timeSeries\": [")?;
        let transport = Arc::new(MockTransport::ok(IV_DISCHARGE_JSON));
        let fetcher = CachedFetcher::<JsonFormat<WaterMlResponse>, _>::new(transport.clone());

        let payload = fetcher.fetch(URL, &path).await.ok_or("expected payload")?;

        assert_eq!(transport.calls(), 1);
        assert_eq!(payload.value.time_series.len(), 1);
        let repaired: WaterMlResponse = serde_json::from_slice(&std::fs::read(&path)?)?;
        assert_eq!(repaired, payload);
        Ok(())
    }

    #[tokio::test]
    async fn test_cache_with_wrong_shape_is_refetched() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let path = json_path(&dir);
        std::fs::write(&path, r#"{"value": {"queryInfo": {}}}"#)?;
        let transport = Arc::new(MockTransport::ok(IV_DISCHARGE_JSON));
        let fetcher = CachedFetcher::<JsonFormat<WaterMlResponse>, _>::new(transport.clone());

        assert!(fetcher.fetch(URL, &path).await.is_some());
        assert_eq!(transport.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_non_json_body_is_not_cached() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let path = json_path(&dir);
        let transport = Arc::new(MockTransport::ok("<html>maintenance</html>"));
        let fetcher = CachedFetcher::<JsonFormat, _>::new(transport);

        assert!(matches!(
            fetcher.try_fetch(URL, &path).await,
            Err(FetchError::Decode { .. })
        ));
        assert!(!path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_rdb_miss_and_hit_strip_width_row() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("deeper").join("values.rdb");
        let transport = Arc::new(MockTransport::ok(SMALL_RDB));
        let fetcher = CachedFetcher::<RdbFormat, _>::new(transport.clone());

        let fresh = fetcher.fetch(URL, &path).await.ok_or("expected payload")?;
        let cached = fetcher.fetch(URL, &path).await.ok_or("expected payload")?;

        assert_eq!(fresh.height(), 2);
        assert!(fresh.equals_missing(&cached));
        assert_eq!(transport.calls(), 1);
        // comments and the width row survive on disk
        assert_eq!(std::fs::read(&path)?, SMALL_RDB.as_bytes());
        Ok(())
    }

    #[tokio::test]
    async fn test_rdb_fixture_round_trip() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("iv.rdb");
        let fetcher = CachedFetcher::<RdbFormat, _>::new(Arc::new(MockTransport::ok(IV_RDB)));

        let df = fetcher.fetch(URL, &path).await.ok_or("expected payload")?;

        assert_eq!(df.height(), 3);
        assert_eq!(df.column("datetime")?.str()?.get(0), Some("2024-05-01 00:00"));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_rdb_cache_is_refetched() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("values.rdb");
        std::fs::write(&path, "")?;
        let transport = Arc::new(MockTransport::ok(SMALL_RDB));
        let fetcher = CachedFetcher::<RdbFormat, _>::new(transport.clone());

        let df = fetcher.fetch(URL, &path).await.ok_or("expected payload")?;

        assert_eq!(df.height(), 2);
        assert_eq!(transport.calls(), 1);
        assert_eq!(std::fs::read(&path)?, SMALL_RDB.as_bytes());
        Ok(())
    }

    #[tokio::test]
    async fn test_unparseable_rdb_body_is_cached_then_refetched() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("values.rdb");
        let transport = Arc::new(MockTransport::ok(""));
        let fetcher = CachedFetcher::<RdbFormat, _>::new(transport.clone());

        assert!(fetcher.fetch(URL, &path).await.is_none());
        // the raw body is stored before parsing
        assert_eq!(std::fs::read(&path)?, b"");
        assert_eq!(transport.calls(), 1);

        let second = fetcher.try_fetch(URL, &path).await;
        assert!(matches!(second, Err(FetchError::Decode { .. })));
        assert_eq!(transport.calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_misses_leave_valid_file() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let path = json_path(&dir);
        let transport = Arc::new(MockTransport::ok(IV_DISCHARGE_JSON));
        let fetcher = CachedFetcher::<JsonFormat<WaterMlResponse>, _>::new(transport.clone());

        let (first, second) = tokio::join!(fetcher.fetch(URL, &path), fetcher.fetch(URL, &path));

        let first = first.ok_or("first call failed")?;
        let second = second.ok_or("second call failed")?;
        assert_eq!(first, second);
        assert!((1..=2).contains(&transport.calls()));
        let on_disk: WaterMlResponse = serde_json::from_slice(&std::fs::read(&path)?)?;
        assert_eq!(on_disk, first);
        // no temp files left behind
        assert_eq!(files_in(dir.path()), vec![path.clone()]);
        Ok(())
    }
}

use crate::water_data::error::TransportError;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// A completed HTTP exchange. Non-2xx statuses are still a response here; the
/// fetcher decides what they mean.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// The network seam of [`crate::CachedFetcher`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Bounds every request (connect through end of body) by `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::new("<client builder>", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        info!("Requesting {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::new(url, e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::new(url, e))?;
        debug!("{} answered {} with {} bytes", url, status, body.len());
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replies to every GET with the same canned response and records the URLs.
    pub struct MockTransport {
        reply: Result<(StatusCode, Vec<u8>), String>,
        calls: AtomicUsize,
        urls: Mutex<Vec<String>>,
    }

    impl MockTransport {
        pub fn ok(body: impl Into<Vec<u8>>) -> Self {
            Self::with_status(StatusCode::OK, body)
        }

        pub fn with_status(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
            Self {
                reply: Ok((status, body.into())),
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
            }
        }

        /// Every call fails before a response is received.
        pub fn unreachable(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn urls(&self) -> Vec<String> {
            self.urls.lock().map(|u| u.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut urls) = self.urls.lock() {
                urls.push(url.to_string());
            }
            // Give racing callers a chance to interleave.
            tokio::task::yield_now().await;
            match &self.reply {
                Ok((status, body)) => Ok(HttpResponse {
                    status: *status,
                    body: body.clone(),
                }),
                Err(message) => Err(TransportError::new(url, message.clone())),
            }
        }
    }
}

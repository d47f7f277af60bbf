//! Asset transport abstraction
//!
//! Fetching is behind [`AssetSource`] so the loader can be pointed at the
//! hosted capture, a local copy on disk, or an in-memory mock in tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;

/// Transport-level failure while fetching a single resource
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Timed out fetching {0}")]
    Timeout(String),
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },
}

/// A source of raw asset bytes, addressed by location string.
///
/// Returned futures are `'static` so each fetch can run as an independent task.
pub trait AssetSource: Send + Sync {
    /// Fetch the complete body of the resource at `location`
    fn fetch(&self, location: &str) -> BoxFuture<'static, Result<Bytes, FetchError>>;
}

/// HTTP(S) asset source backed by an async reqwest client
#[derive(Clone)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    /// Create an HTTP source, optionally bounding every request by `timeout`
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl AssetSource for HttpSource {
    fn fetch(&self, location: &str) -> BoxFuture<'static, Result<Bytes, FetchError>> {
        let client = self.client.clone();
        let url = location.to_string();

        Box::pin(async move {
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| request_error(&e, &url))?;

            if let Some(error) = status_error(response.status(), &url) {
                return Err(error);
            }

            response.bytes().await.map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(url.clone())
                } else {
                    FetchError::Http(format!("Failed to read body of {}: {}", url, e))
                }
            })
        })
    }
}

fn request_error(error: &reqwest::Error, url: &str) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Http(format!("Request to {} failed: {}", url, error))
    }
}

/// Any non-2xx response fails the fetch
fn status_error(status: reqwest::StatusCode, url: &str) -> Option<FetchError> {
    if status.is_success() {
        None
    } else {
        Some(FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}

/// Local filesystem asset source
///
/// Accepts plain paths and `file://` URLs.
#[derive(Debug, Clone, Default)]
pub struct FileSource;

impl FileSource {
    fn resolve(location: &str) -> PathBuf {
        PathBuf::from(location.strip_prefix("file://").unwrap_or(location))
    }
}

impl AssetSource for FileSource {
    fn fetch(&self, location: &str) -> BoxFuture<'static, Result<Bytes, FetchError>> {
        let path = Self::resolve(location);

        Box::pin(async move {
            tokio::fs::read(&path)
                .await
                .map(Bytes::from)
                .map_err(|e| FetchError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })
        })
    }
}

/// Pick the asset source matching the scheme of `base_url`
pub fn source_for(
    base_url: &str,
    timeout: Option<Duration>,
) -> Result<Arc<dyn AssetSource>, FetchError> {
    if base_url.starts_with("http://") || base_url.starts_with("https://") {
        Ok(Arc::new(HttpSource::new(timeout)?))
    } else {
        Ok(Arc::new(FileSource))
    }
}

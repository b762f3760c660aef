//! Sync transports
//!
//! A transport moves the serialized journal document to and from the
//! remote store. Two implementations ship:
//! - `FileTransport`: a file in a folder shared by a cloud-drive client
//! - `HttpTransport`: GET/PUT against a document URL
//!
//! Credentials are configured outside the core; the HTTP transport only
//! forwards an optional bearer token.

use crate::sync::error::TransportError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Remote store for the shared journal document
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Fetch the remote document, `None` if nothing has been pushed yet
    async fn fetch(&self) -> Result<Option<String>, TransportError>;

    /// Replace the remote document
    async fn push(&self, document: &str) -> Result<(), TransportError>;
}

/// Journal document stored as a file, typically inside a synced folder
pub struct FileTransport {
    path: PathBuf,
}

impl FileTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SyncTransport for FileTransport {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self) -> Result<Option<String>, TransportError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    async fn push(&self, document: &str) -> Result<(), TransportError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, document).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// URL of the journal document
    pub url: String,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
}

/// Journal document behind an HTTP endpoint (GET to fetch, PUT to push)
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, &self.config.url);
        match &self.config.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

fn map_request_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Unavailable(e.to_string())
    } else {
        TransportError::Request(e)
    }
}

async fn api_error(response: reqwest::Response) -> TransportError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    TransportError::Api { status, message }
}

#[async_trait]
impl SyncTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self) -> Result<Option<String>, TransportError> {
        let response = self
            .request(reqwest::Method::GET)
            .send()
            .await
            .map_err(map_request_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let body = response.text().await.map_err(map_request_error)?;
        Ok(Some(body))
    }

    async fn push(&self, document: &str) -> Result<(), TransportError> {
        let response = self
            .request(reqwest::Method::PUT)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(document.to_string())
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory remote with failure and latency switches
    #[derive(Default)]
    pub struct MemoryTransport {
        document: Mutex<Option<String>>,
        pub fail_fetch: AtomicBool,
        pub fail_push: AtomicBool,
        delay: Mutex<Option<Duration>>,
        pub fetches: AtomicUsize,
        pub pushes: AtomicUsize,
    }

    impl MemoryTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_document(document: impl Into<String>) -> Self {
            let transport = Self::default();
            transport.set_document(document);
            transport
        }

        pub fn set_document(&self, document: impl Into<String>) {
            *self.document.lock().unwrap() = Some(document.into());
        }

        pub fn document(&self) -> Option<String> {
            self.document.lock().unwrap().clone()
        }

        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = Some(delay);
        }

        async fn wait(&self) {
            let delay = *self.delay.lock().unwrap();
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
        }
    }

    #[async_trait]
    impl SyncTransport for MemoryTransport {
        fn name(&self) -> &str {
            "memory"
        }

        async fn fetch(&self) -> Result<Option<String>, TransportError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.wait().await;
            if self.fail_fetch.load(Ordering::SeqCst) {
                return Err(TransportError::Unavailable("remote offline".into()));
            }
            Ok(self.document())
        }

        async fn push(&self, document: &str) -> Result<(), TransportError> {
            self.pushes.fetch_add(1, Ordering::SeqCst);
            self.wait().await;
            if self.fail_push.load(Ordering::SeqCst) {
                return Err(TransportError::Unavailable("remote offline".into()));
            }
            self.set_document(document);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_transport_roundtrip() {
        let dir = tempdir().unwrap();
        let transport = FileTransport::new(dir.path().join("shared").join("journal.json"));

        assert_eq!(transport.fetch().await.unwrap(), None);

        transport.push("{\"a\":1}").await.unwrap();
        assert_eq!(transport.fetch().await.unwrap().as_deref(), Some("{\"a\":1}"));

        transport.push("{}").await.unwrap();
        assert_eq!(transport.fetch().await.unwrap().as_deref(), Some("{}"));
        assert!(!dir.path().join("shared").join("journal.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_http_transport_unreachable() {
        let transport = HttpTransport::new(HttpTransportConfig {
            url: "http://127.0.0.1:1/journal.json".to_string(),
            bearer_token: Some("secret".to_string()),
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        let err = transport.fetch().await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Unavailable(_) | TransportError::Timeout | TransportError::Request(_)
        ));
    }
}

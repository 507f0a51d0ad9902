use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;

/// A file available on the remote store, identified by its web path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileRef {
    pub web_path: String,
}

impl RemoteFileRef {
    pub fn new(web_path: impl Into<String>) -> Self {
        Self {
            web_path: web_path.into(),
        }
    }
}

/// Errors that can occur when talking to the remote store.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("parse error: {0}")]
    Parse(String),
}

/// The body of a remote file, delivered chunk by chunk.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RemoteError>> + Send>>;

/// A remote collection of files that can be listed, fetched, and deleted.
///
/// Every call is expected to carry the store's credentials.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Human-readable label identifying this store in logs.
    fn label(&self) -> &str;

    /// List every file currently available.
    async fn list(&self) -> Result<Vec<RemoteFileRef>, RemoteError>;

    /// Open the body of the file at `web_path` for streaming.
    ///
    /// Failures to connect or a non-success status are reported here; errors
    /// after the body starts arrive through the stream.
    async fn fetch(&self, web_path: &str) -> Result<ByteStream, RemoteError>;

    /// Remove the file at `web_path` from the store.
    async fn delete(&self, web_path: &str) -> Result<(), RemoteError>;
}

#[async_trait::async_trait]
impl<T: RemoteStore + ?Sized> RemoteStore for Arc<T> {
    fn label(&self) -> &str {
        (**self).label()
    }

    async fn list(&self) -> Result<Vec<RemoteFileRef>, RemoteError> {
        (**self).list().await
    }

    async fn fetch(&self, web_path: &str) -> Result<ByteStream, RemoteError> {
        (**self).fetch(web_path).await
    }

    async fn delete(&self, web_path: &str) -> Result<(), RemoteError> {
        (**self).delete(web_path).await
    }
}

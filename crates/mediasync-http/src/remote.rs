use futures::TryStreamExt;
use mediasync::{ByteStream, RemoteError, RemoteFileRef, RemoteStore};
use reqwest::Method;
use tracing::debug;
use url::Url;

use crate::endpoint::{self, FILE_INFO_PATH};
use crate::file_info::FileInfo;

const USER_AGENT: &str = concat!("mediasync/", env!("CARGO_PKG_VERSION"));

/// Connection settings for an HTTP media store.
#[derive(Debug, Clone)]
pub struct HttpRemoteConfig {
    pub base_url: Url,
    pub username: String,
    pub password: String,
}

/// A remote media store reached over HTTP with basic authentication.
///
/// - `GET {base}/fileinfo` lists files
/// - `GET {base}{web_path}` fetches one
/// - `DELETE {base}{web_path}` removes one
pub struct HttpRemote {
    config: HttpRemoteConfig,
    client: reqwest::Client,
    label: String,
}

impl HttpRemote {
    pub fn new(config: HttpRemoteConfig) -> Self {
        let label = config
            .base_url
            .host_str()
            .unwrap_or("remote")
            .to_owned();

        Self {
            config,
            client: reqwest::Client::new(),
            label,
        }
    }

    /// The full URL of a web path on this store.
    pub fn url_for(&self, web_path: &str) -> Url {
        endpoint::join(&self.config.base_url, web_path)
    }

    fn build_request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("User-Agent", USER_AGENT)
            .basic_auth(&self.config.username, Some(&self.config.password))
    }

    /// Send a request, treating any non-success status as an error.
    async fn send(&self, method: Method, url: Url) -> Result<reqwest::Response, RemoteError> {
        debug!(%method, %url, "remote request");

        let response = self
            .build_request(method, url.clone())
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RemoteError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl RemoteStore for HttpRemote {
    fn label(&self) -> &str {
        &self.label
    }

    async fn list(&self) -> Result<Vec<RemoteFileRef>, RemoteError> {
        let files: Vec<FileInfo> = self
            .send(Method::GET, self.url_for(FILE_INFO_PATH))
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Parse(format!("couldn't parse json: {e}")))?;

        Ok(files
            .into_iter()
            .map(|f| RemoteFileRef::new(f.web_path))
            .collect())
    }

    async fn fetch(&self, web_path: &str) -> Result<ByteStream, RemoteError> {
        let response = self.send(Method::GET, self.url_for(web_path)).await?;

        Ok(Box::pin(
            response
                .bytes_stream()
                .map_err(|e| RemoteError::Network(e.to_string())),
        ))
    }

    async fn delete(&self, web_path: &str) -> Result<(), RemoteError> {
        // The acknowledgement body carries nothing we use.
        self.send(Method::DELETE, self.url_for(web_path)).await?;
        Ok(())
    }
}

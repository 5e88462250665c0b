//! The network side of a fetch. [`HttpClient`] is the seam the
//! [`Fetcher`](crate::Fetcher) talks to, [`ReqwestClient`] the implementation
//! used by the binary.

use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream::BoxStream};
use miette::Diagnostic;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Diagnostic)]
pub enum NetworkError {
    #[error("failed to create the http client")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed")]
    #[diagnostic(help("check your network connection and proxy settings"))]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with {status}")]
    Status { url: Url, status: StatusCode },

    #[error("the transfer from {url} was interrupted")]
    Transfer {
        url: Url,
        #[source]
        source: io::Error,
    },
}

/// A response body that is being streamed.
pub struct Download {
    /// The size announced by the server, only used to draw progress.
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, io::Result<Bytes>>,
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issues a GET request and returns the body as a stream. Non-success
    /// status codes are errors.
    async fn get(&self, url: &Url) -> Result<Download, NetworkError>;
}

/// [`HttpClient`] backed by [`reqwest`]. No retries and no timeouts; redirects
/// follow the reqwest defaults.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(tls_no_verify: bool) -> Result<Self, NetworkError> {
        static APP_USER_AGENT: &str = concat!("fenrir/", env!("CARGO_PKG_VERSION"));

        if tls_no_verify {
            tracing::warn!(
                "TLS verification is disabled. This is insecure and should only be used for testing or internal networks."
            );
        }

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .danger_accept_invalid_certs(tls_no_verify)
            .build()
            .map_err(NetworkError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &Url) -> Result<Download, NetworkError> {
        tracing::debug!("GET {url}");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| NetworkError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: url.clone(),
                status,
            });
        }

        Ok(Download {
            content_length: response.content_length(),
            body: response.bytes_stream().map(|chunk| chunk.map_err(io::Error::other)).boxed(),
        })
    }
}

//! HTTP transport seam
//!
//! The request lifecycle talks to the network only through [`Transport`].
//! [`ReqwestTransport`] is the default implementation; tests and embedders
//! can supply their own.

use crate::config::SyncerConfig;
use crate::error::{Result, TransportError};
use crate::types::{Headers, HttpMethod};
use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::fmt;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// A fully prepared request handed to the transport
#[derive(Clone, Debug)]
pub struct TransportRequest {
    /// Target URL
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request headers
    pub headers: Headers,
    /// Request body
    pub body: Option<Bytes>,
}

/// Response head plus a deferred body
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Status text (reason phrase)
    pub status_text: String,
    /// Response headers
    pub headers: HeaderMap,
    body: BoxFuture<'static, std::result::Result<Bytes, TransportError>>,
}

impl TransportResponse {
    /// Create a response whose body is produced by `body` when materialized
    pub fn new<B>(status: u16, status_text: impl Into<String>, headers: HeaderMap, body: B) -> Self
    where
        B: Future<Output = std::result::Result<Bytes, TransportError>> + Send + 'static,
    {
        Self {
            status,
            status_text: status_text.into(),
            headers,
            body: body.boxed(),
        }
    }

    /// Create a response with an in-memory body and the canonical reason phrase
    pub fn from_bytes(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        let status_text = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default();
        let body = body.into();
        Self::new(status, status_text, headers, async move { Ok(body) })
    }

    /// Header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Materialize the full body
    pub async fn bytes(self) -> std::result::Result<Bytes, TransportError> {
        self.body.await
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Network transport used by [`Syncer`](crate::Syncer)
///
/// Implementations must observe `cancel` and return
/// [`TransportError::Aborted`] once it fires.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the response head
    async fn send(
        &self,
        request: TransportRequest,
        cancel: CancellationToken,
    ) -> std::result::Result<TransportResponse, TransportError>;

    /// Human-readable name for logging
    fn name(&self) -> &str;
}

/// [`Transport`] backed by a shared `reqwest::Client`
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport from the client configuration
    pub fn new(config: &SyncerConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build().map_err(TransportError::from)?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn header_map(headers: &Headers) -> std::result::Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidRequest(format!("header value for {name}: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: TransportRequest,
        cancel: CancellationToken,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.into(), &request.url)
            .headers(header_map(&request.headers)?);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Aborted),
            response = builder.send() => response?,
        };

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default();
        let headers = response.headers().clone();
        let body = async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(TransportError::Aborted),
                bytes = response.bytes() => bytes.map_err(TransportError::from),
            }
        };

        Ok(TransportResponse::new(
            status.as_u16(),
            status_text,
            headers,
            body,
        ))
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}

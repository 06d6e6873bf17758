//! Core request, result and target types

use crate::hooks::{AfterHook, BeforeHook, ProgressHook};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// String-keyed header map as supplied by callers
///
/// Keys are compared case-insensitively when maps are merged (see [`merge_headers`]).
pub type Headers = HashMap<String, String>;

/// HTTP method
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET (default)
    #[default]
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// PATCH
    Patch,
    /// HEAD
    Head,
}

impl HttpMethod {
    /// Canonical upper-case method name
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }
}

/// Coarse classification of a response body
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// `image/*`
    Image,
    /// `text/*`
    Text,
    /// Anything else
    #[default]
    Blob,
}

impl FileType {
    /// Lower-case label (`image`, `text`, `blob`)
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Text => "text",
            FileType::Blob => "blob",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a body from its `content-type` header
///
/// The URL is accepted as a hint but does not influence the decision.
///
/// # Examples
///
/// ```
/// use fetch_syncer::{FileType, classify_content_type};
///
/// assert_eq!(classify_content_type(Some("image/png"), None), FileType::Image);
/// assert_eq!(classify_content_type(Some("text/html; charset=utf-8"), None), FileType::Text);
/// assert_eq!(classify_content_type(Some("application/json"), None), FileType::Blob);
/// assert_eq!(classify_content_type(None, Some("https://x.test/a.png")), FileType::Blob);
/// ```
#[must_use]
pub fn classify_content_type(content_type: Option<&str>, _url: Option<&str>) -> FileType {
    match content_type {
        Some(ct) if ct.starts_with("image/") => FileType::Image,
        Some(ct) if ct.starts_with("text/") => FileType::Text,
        _ => FileType::Blob,
    }
}

/// Overlay `overrides` on `base`, matching header names case-insensitively
///
/// An overriding entry replaces every base entry with the same name (ignoring
/// case) and keeps the overriding spelling.
#[must_use]
pub fn merge_headers(base: &Headers, overrides: &Headers) -> Headers {
    let mut merged: Headers = base
        .iter()
        .filter(|(name, _)| {
            !overrides
                .keys()
                .any(|other| other.eq_ignore_ascii_case(name))
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    merged.extend(
        overrides
            .iter()
            .map(|(name, value)| (name.clone(), value.clone())),
    );
    merged
}

/// Per-call request options
///
/// Every field is optional; unset fields fall back to the
/// [`SyncerConfig`](crate::config::SyncerConfig) of the client making the call.
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// HTTP method (default: GET)
    pub method: Option<HttpMethod>,
    /// Request headers
    pub headers: Headers,
    /// Request body
    pub body: Option<Bytes>,
    /// Timeout for the whole call (zero disables)
    pub timeout: Option<Duration>,
    /// Retry attempts, consumed only by [`Syncer::request_with_retry`](crate::Syncer::request_with_retry)
    pub retries: Option<u32>,
    /// Initial retry delay, consumed only by [`Syncer::request_with_retry`](crate::Syncer::request_with_retry)
    pub retry_delay: Option<Duration>,
    /// External cancellation token
    pub signal: Option<CancellationToken>,
    /// Label copied onto the result; never forwarded to the transport
    pub platform: Option<String>,
    /// Awaited before the transport call
    pub before: Option<Arc<dyn BeforeHook>>,
    /// Awaited after the result is complete; its error propagates
    pub after: Option<Arc<dyn AfterHook>>,
    /// Called once the body has been materialized
    pub progress: Option<Arc<dyn ProgressHook>>,
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body_len", &self.body.as_ref().map(Bytes::len))
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("retry_delay", &self.retry_delay)
            .field("signal", &self.signal.is_some())
            .field("platform", &self.platform)
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Options for [`Syncer::download_concurrent`](crate::Syncer::download_concurrent)
#[derive(Clone, Debug, Default)]
pub struct DownloadOptions {
    /// Options applied to every download
    pub request: RequestOptions,
    /// Proxies tried in order for every URL
    pub proxies: Vec<ProxyEntry>,
    /// Maximum simultaneous downloads (default: the client's `max_concurrency`)
    pub max_concurrency: Option<usize>,
}

/// Outcome of a single request
///
/// `code` is `None` only before the request has been attempted. After a
/// request resolves it holds the HTTP status, `0` for a cancelled request, or
/// a negative value for a transport failure.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestResult {
    /// URL that was requested (the proxied URL for proxy attempts)
    pub url: String,
    /// Status code or failure sentinel
    pub code: Option<i32>,
    /// Human-readable status message
    pub msg: String,
    /// Raw response body
    pub data: Option<Bytes>,
    /// Body classification
    pub file_type: FileType,
    /// `content-type` header value (empty when absent)
    pub content_type: String,
    /// `content-length` header value (0 when absent)
    pub size: u64,
    /// Bytes received
    pub loaded: u64,
    /// Bytes expected
    pub total: u64,
    /// Wall-clock time from request start to settlement
    pub duration: Duration,
    /// Caller-supplied platform label
    pub platform: Option<String>,
}

impl RequestResult {
    /// Fresh result for a request that has not been attempted yet
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Minimal failure record
    pub fn failure(url: impl Into<String>, code: i32, msg: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            code: Some(code),
            msg: msg.into(),
            ..Default::default()
        }
    }

    /// Whether the status code is in `[200, 300)`
    pub fn is_success(&self) -> bool {
        matches!(self.code, Some(code) if (200..300).contains(&code))
    }

    /// Whether the request was cancelled (timeout or external token)
    pub fn is_cancelled(&self) -> bool {
        self.code == Some(0)
    }
}

/// A proxy to route a request through
///
/// Deserializes from either a bare string or `{ "url": ..., "prefix": bool }`;
/// `perfix` is accepted as an alias for `prefix`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProxyEntry {
    /// Prefix prepended to the full original URL
    Prefix(String),
    /// Proxy host with explicit concatenation mode
    Host {
        /// Proxy URL
        url: String,
        /// `true`: append the full original URL; `false`: append only path, query and fragment
        #[serde(default, alias = "perfix")]
        prefix: bool,
    },
}

impl ProxyEntry {
    /// The proxy's own URL or prefix
    pub fn url(&self) -> &str {
        match self {
            ProxyEntry::Prefix(url) | ProxyEntry::Host { url, .. } => url,
        }
    }
}

/// An upload destination
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformTarget {
    /// Label attached to this target's result
    pub name: String,
    /// Upload URL
    pub url: String,
    /// Method used when the caller does not set one (default: POST)
    #[serde(default)]
    pub method: Option<HttpMethod>,
    /// Target-specific headers; caller headers win on conflict
    #[serde(default)]
    pub headers: Headers,
    /// Git branch merged into structured payloads
    #[serde(default)]
    pub branch: Option<String>,
    /// Git blob SHA merged into structured payloads
    #[serde(default)]
    pub sha: Option<String>,
}

/// Payload for [`Syncer::upload_parallel`](crate::Syncer::upload_parallel)
#[derive(Clone, Debug, PartialEq)]
pub enum UploadPayload {
    /// Sent verbatim
    Binary(Bytes),
    /// JSON object, merged with the target's `branch`/`sha` and serialized
    Structured(serde_json::Map<String, serde_json::Value>),
}

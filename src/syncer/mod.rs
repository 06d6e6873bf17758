//! Request client split into focused submodules.
//!
//! The `Syncer` struct and its methods are organized by concern:
//! - [`request`] - Single-request lifecycle (hooks, timeout, cancellation, status mapping)
//! - [`proxy`] - Sequential proxy fallback
//! - [`batch`] - Bounded-concurrency downloads and parallel uploads

mod batch;
mod proxy;
mod request;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use proxy::ALL_PROXIES_FAILED_MESSAGE;
pub use request::{CANCELLED_MESSAGE, NETWORK_ERROR_MESSAGE, status_message};

use crate::config::SyncerConfig;
use crate::error::Result;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{FileType, classify_content_type};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// HTTP request client (cloneable - all fields are Arc-wrapped)
///
/// Holds the caller-owned defaults and the transport; every call merges its
/// own [`RequestOptions`](crate::RequestOptions) over those defaults.
#[derive(Clone)]
pub struct Syncer {
    /// Client defaults (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<SyncerConfig>,
    /// Network transport (trait object for pluggable implementations)
    pub(crate) transport: Arc<dyn Transport>,
}

impl Syncer {
    /// Create a client using the default reqwest transport
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fetch_syncer::{Syncer, SyncerConfig, RequestOptions};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let syncer = Syncer::new(SyncerConfig::default())?;
    ///     let result = syncer
    ///         .request("https://example.com/logo.png", RequestOptions::default())
    ///         .await?;
    ///     println!("{:?} {} ({} bytes)", result.code, result.msg, result.size);
    ///     Ok(())
    /// }
    /// ```
    pub fn new(config: SyncerConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client with a custom transport
    pub fn with_transport(config: SyncerConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            transport = transport.name(),
            timeout_ms = config.timeout.as_millis() as u64,
            max_concurrency = config.max_concurrency,
            "Syncer initialized"
        );
        Ok(Self {
            config: Arc::new(config),
            transport,
        })
    }

    /// Client defaults
    pub fn config(&self) -> &SyncerConfig {
        &self.config
    }

    /// Create a token that can cancel requests it is passed to
    pub fn create_cancellation_token(&self) -> CancellationToken {
        crate::cancel::create_cancellation_token()
    }

    /// Classify a body from its `content-type` header (the URL is an unused hint)
    pub fn classify_content_type(&self, content_type: Option<&str>, url: Option<&str>) -> FileType {
        classify_content_type(content_type, url)
    }
}

impl std::fmt::Debug for Syncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Syncer")
            .field("config", &self.config)
            .field("transport", &self.transport.name())
            .finish()
    }
}

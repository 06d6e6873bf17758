//! # fetch-syncer
//!
//! Async HTTP request helper for syncing assets between web platforms.
//!
//! ## Design Philosophy
//!
//! fetch-syncer is designed to be:
//! - **Failure-as-data** - Network errors, timeouts and HTTP error statuses are
//!   recorded on a [`RequestResult`] instead of being returned as `Err`
//! - **Sensible defaults** - Works out of the box with zero configuration
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Pluggable** - Hooks around every request and a swappable [`transport::Transport`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use fetch_syncer::{DownloadOptions, ProxyEntry, Syncer, SyncerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let syncer = Syncer::new(SyncerConfig::default())?;
//!
//!     let urls = vec![
//!         "https://example.com/a.png".to_string(),
//!         "https://example.com/b.png".to_string(),
//!     ];
//!     let options = DownloadOptions {
//!         proxies: vec![ProxyEntry::Prefix("https://cors.example/".into())],
//!         max_concurrency: Some(2),
//!         ..Default::default()
//!     };
//!
//!     for result in syncer.download_concurrent(&urls, options).await {
//!         let result = result?;
//!         println!("{} -> {:?} {}", result.url, result.code, result.msg);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Request cancellation tokens and timeouts
pub mod cancel;
/// Base64 and response body helpers
pub mod codec;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Bounded-concurrency FIFO admission queue
pub mod gate;
/// Before, after and progress hooks
pub mod hooks;
/// Retry logic with exponential backoff
pub mod retry;
/// Request client (decomposed into focused submodules)
pub mod syncer;
/// Network transport seam
pub mod transport;
/// Core request and result types
pub mod types;

// Re-export commonly used types
pub use cancel::create_cancellation_token;
pub use config::{RetryConfig, SyncerConfig};
pub use error::{Error, HookError, Result, TransportError};
pub use gate::ConcurrencyGate;
pub use syncer::{
    ALL_PROXIES_FAILED_MESSAGE, CANCELLED_MESSAGE, NETWORK_ERROR_MESSAGE, Syncer, status_message,
};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    DownloadOptions, FileType, Headers, HttpMethod, PlatformTarget, ProxyEntry, RequestOptions,
    RequestResult, UploadPayload, classify_content_type, merge_headers,
};

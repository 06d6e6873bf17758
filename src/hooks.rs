//! Request hooks
//!
//! Hooks are attached per call through [`RequestOptions`]. The two async hooks
//! differ in how their failures are treated:
//!
//! - a failing [`BeforeHook`] aborts the call and is recorded on the result
//!   like any transport failure;
//! - a failing [`AfterHook`] propagates to the caller as
//!   [`Error::Hook`](crate::Error::Hook).
//!
//! Closures can be adapted with [`before_fn`], [`after_fn`] and [`progress_fn`].

use crate::error::HookError;
use crate::types::{RequestOptions, RequestResult};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Hook awaited before the transport call
#[async_trait]
pub trait BeforeHook: Send + Sync {
    /// Inspect the URL and merged options of the upcoming request
    async fn before(&self, url: &str, options: &RequestOptions) -> Result<(), HookError>;
}

/// Hook awaited once the result is complete
#[async_trait]
pub trait AfterHook: Send + Sync {
    /// Inspect the finished result
    async fn after(&self, url: &str, result: &RequestResult) -> Result<(), HookError>;
}

/// Progress callback `(url, loaded, total)`
pub trait ProgressHook: Send + Sync {
    /// Report transferred bytes
    fn progress(&self, url: &str, loaded: u64, total: u64);
}

impl<F> ProgressHook for F
where
    F: Fn(&str, u64, u64) + Send + Sync,
{
    fn progress(&self, url: &str, loaded: u64, total: u64) {
        self(url, loaded, total)
    }
}

struct FnBefore<F>(F);

#[async_trait]
impl<F, Fut> BeforeHook for FnBefore<F>
where
    F: Fn(String, RequestOptions) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HookError>> + Send,
{
    async fn before(&self, url: &str, options: &RequestOptions) -> Result<(), HookError> {
        (self.0)(url.to_string(), options.clone()).await
    }
}

struct FnAfter<F>(F);

#[async_trait]
impl<F, Fut> AfterHook for FnAfter<F>
where
    F: Fn(String, RequestResult) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HookError>> + Send,
{
    async fn after(&self, url: &str, result: &RequestResult) -> Result<(), HookError> {
        (self.0)(url.to_string(), result.clone()).await
    }
}

/// Adapt an async closure into a [`BeforeHook`]
///
/// # Examples
///
/// ```
/// use fetch_syncer::{RequestOptions, hooks::before_fn};
///
/// let options = RequestOptions {
///     before: Some(before_fn(|url, _options| async move {
///         tracing::debug!(%url, "sending");
///         Ok(())
///     })),
///     ..Default::default()
/// };
/// # let _ = options;
/// ```
pub fn before_fn<F, Fut>(f: F) -> Arc<dyn BeforeHook>
where
    F: Fn(String, RequestOptions) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HookError>> + Send + 'static,
{
    Arc::new(FnBefore(f))
}

/// Adapt an async closure into an [`AfterHook`]
pub fn after_fn<F, Fut>(f: F) -> Arc<dyn AfterHook>
where
    F: Fn(String, RequestResult) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HookError>> + Send + 'static,
{
    Arc::new(FnAfter(f))
}

/// Adapt a closure into a [`ProgressHook`]
pub fn progress_fn<F>(f: F) -> Arc<dyn ProgressHook>
where
    F: Fn(&str, u64, u64) + Send + Sync + 'static,
{
    Arc::new(f)
}

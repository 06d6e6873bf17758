//! Cancellation tokens and request timers
//!
//! A request runs under one effective token. When the caller supplies a
//! token, the effective token is a child of it, so cancelling either the
//! caller's token or the request's own timeout cancels the request, while the
//! timeout never reaches back into the caller's token.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Create a fresh cancellation token for use as [`RequestOptions::signal`](crate::RequestOptions::signal)
#[must_use]
pub fn create_cancellation_token() -> CancellationToken {
    CancellationToken::new()
}

/// Build the effective token for one request
///
/// Cancelled when `external` is cancelled or when the returned token itself
/// is cancelled.
#[must_use]
pub fn link_token(external: Option<&CancellationToken>) -> CancellationToken {
    match external {
        Some(external) => external.child_token(),
        None => CancellationToken::new(),
    }
}

/// Cancels a token once a timeout elapses, unless dropped first
///
/// Dropping the timer clears it: the pending cancellation is aborted and
/// will not fire after the request has settled.
#[derive(Debug)]
pub(crate) struct TimeoutTimer {
    handle: JoinHandle<()>,
}

impl TimeoutTimer {
    /// Schedule cancellation of `token` after `timeout`; a zero timeout schedules nothing
    pub(crate) fn schedule(token: &CancellationToken, timeout: Duration) -> Option<Self> {
        if timeout.is_zero() {
            return None;
        }
        let token = token.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::debug!(timeout_ms = timeout.as_millis() as u64, "request timed out");
            token.cancel();
        });
        Some(Self { handle })
    }
}

impl Drop for TimeoutTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

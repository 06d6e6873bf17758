//! Single-request lifecycle.

use crate::cancel::{TimeoutTimer, link_token};
use crate::config::RetryConfig;
use crate::error::{GENERIC_FAILURE_CODE, HookError, Result, TransportError};
use crate::retry::with_retry;
use crate::transport::TransportRequest;
use crate::types::{RequestOptions, RequestResult, classify_content_type, merge_headers};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tokio::time::Instant;

use super::Syncer;

/// Message recorded when a request is cancelled by timeout or token
pub const CANCELLED_MESSAGE: &str = "request cancelled";

/// Message recorded when a failure carries no message of its own
pub const NETWORK_ERROR_MESSAGE: &str = "network error";

/// Map an HTTP status to the human-readable message recorded on the result
///
/// # Examples
///
/// ```
/// use fetch_syncer::status_message;
///
/// assert_eq!(status_message(204, "No Content"), "ok");
/// assert_eq!(status_message(404, "Not Found"), "not found");
/// assert_eq!(status_message(418, "I'm a teapot"), "request failed: I'm a teapot");
/// ```
#[must_use]
pub fn status_message(status: u16, status_text: &str) -> String {
    match status {
        200 | 201 | 204 => "ok".to_string(),
        429 => "too many requests, retry later".to_string(),
        401 => "unauthorized, check credentials".to_string(),
        403 => "forbidden".to_string(),
        404 => "not found".to_string(),
        500 => "internal server error".to_string(),
        _ => format!("request failed: {status_text}"),
    }
}

/// Why an attempt ended without a materialized response
#[derive(Debug)]
enum Failure {
    Cancelled,
    Failed { code: i32, message: String },
}

impl From<TransportError> for Failure {
    fn from(e: TransportError) -> Self {
        if e.is_aborted() {
            return Failure::Cancelled;
        }
        Failure::Failed {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

impl From<HookError> for Failure {
    fn from(e: HookError) -> Self {
        Failure::Failed {
            code: e.code.unwrap_or(GENERIC_FAILURE_CODE),
            message: e.message,
        }
    }
}

impl Failure {
    fn record(self, result: &mut RequestResult) {
        match self {
            Failure::Cancelled => {
                result.code = Some(0);
                result.msg = CANCELLED_MESSAGE.to_string();
            }
            Failure::Failed { code, message } => {
                result.code = Some(code);
                result.msg = if message.is_empty() {
                    NETWORK_ERROR_MESSAGE.to_string()
                } else {
                    message
                };
            }
        }
    }
}

impl Syncer {
    /// Execute one request end to end
    ///
    /// Every failure up to and including body materialization is recorded on
    /// the returned result: cancellation (timeout or `options.signal`) as code
    /// `0`, transport and before-hook failures as a negative or
    /// failure-supplied code. HTTP error statuses are ordinary results.
    ///
    /// # Errors
    ///
    /// Only a failing `after` hook produces an `Err`.
    pub async fn request(&self, url: &str, options: RequestOptions) -> Result<RequestResult> {
        let started = Instant::now();
        let mut options = self.merge_defaults(options);
        let mut result = RequestResult::new(url);

        tracing::debug!(
            url = %url,
            method = %options.method.unwrap_or_default(),
            "request started"
        );

        if let Err(failure) = self.attempt(url, &mut options, &mut result).await {
            failure.record(&mut result);
        }

        result.duration = started.elapsed();
        tracing::debug!(
            url = %url,
            code = ?result.code,
            duration_ms = result.duration.as_millis() as u64,
            "request finished"
        );

        if let Some(after) = options.after.clone() {
            after.after(url, &result).await.inspect_err(|e| {
                tracing::warn!(url = %url, error = %e, "after hook failed");
            })?;
        }

        Ok(result)
    }

    /// [`request`](Self::request) with exponential backoff retries
    ///
    /// Retries cancelled, transport-failed, 429 and 5xx outcomes up to
    /// `options.retries` times (default: the client's retry policy), starting
    /// from `options.retry_delay`. A cancelled `options.signal` stops retrying.
    /// After-hook failures are returned immediately.
    pub async fn request_with_retry(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<RequestResult> {
        let policy = RetryConfig {
            max_attempts: options.retries.unwrap_or(self.config.retry.max_attempts),
            initial_delay: options
                .retry_delay
                .unwrap_or(self.config.retry.initial_delay),
            ..self.config.retry.clone()
        };
        let signal = options.signal.clone();

        with_retry(&policy, signal.as_ref(), || self.request(url, options.clone())).await
    }

    /// Fill unset options from the client defaults; caller values win
    fn merge_defaults(&self, mut options: RequestOptions) -> RequestOptions {
        options.timeout.get_or_insert(self.config.timeout);
        options.retries.get_or_insert(self.config.retry.max_attempts);
        options
            .retry_delay
            .get_or_insert(self.config.retry.initial_delay);
        if !self.config.default_headers.is_empty() {
            options.headers = merge_headers(&self.config.default_headers, &options.headers);
        }
        options
    }

    /// Run hooks, transport and body materialization, filling `result`
    ///
    /// The timeout timer lives for the duration of this call, so it is
    /// cleared on every exit path before the caller computes the duration.
    async fn attempt(
        &self,
        url: &str,
        options: &mut RequestOptions,
        result: &mut RequestResult,
    ) -> std::result::Result<(), Failure> {
        let token = link_token(options.signal.as_ref());

        if let Some(before) = options.before.clone() {
            before.before(url, options).await.inspect_err(|e| {
                tracing::warn!(url = %url, error = %e, "before hook failed");
            })?;
        }

        if let Some(platform) = options.platform.take() {
            result.platform = Some(platform);
        }

        let _timer = TimeoutTimer::schedule(&token, options.timeout.unwrap_or_default());

        let request = TransportRequest {
            url: url.to_string(),
            method: options.method.unwrap_or_default(),
            headers: options.headers.clone(),
            body: options.body.clone(),
        };

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Failure::Cancelled),
            response = self.transport.send(request, token.clone()) => response?,
        };

        result.code = Some(i32::from(response.status));
        result.msg = status_message(response.status, &response.status_text);

        let content_type = response.header(CONTENT_TYPE.as_str()).unwrap_or_default().to_string();
        let size = response
            .header(CONTENT_LENGTH.as_str())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);

        let data = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Failure::Cancelled),
            data = response.bytes() => data?,
        };

        result.file_type = classify_content_type(Some(&content_type), Some(url));
        result.content_type = content_type;
        result.size = size;
        result.loaded = data.len() as u64;
        result.total = if size > 0 { size } else { result.loaded };
        result.data = Some(data);

        if let Some(progress) = &options.progress {
            progress.progress(url, result.loaded, result.total);
        }

        Ok(())
    }
}

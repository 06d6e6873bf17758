//! Bounded-concurrency downloads and parallel uploads.

use crate::error::Result;
use crate::gate::ConcurrencyGate;
use crate::types::{
    DownloadOptions, Headers, HttpMethod, PlatformTarget, RequestOptions, RequestResult,
    UploadPayload, merge_headers,
};
use bytes::Bytes;
use futures::future::join_all;
use serde_json::Value;

use super::Syncer;

impl Syncer {
    /// Download every URL through [`request_with_proxy`](Self::request_with_proxy),
    /// at most `options.max_concurrency` at a time
    ///
    /// Downloads start in input order. Every outcome is collected (one
    /// failure never aborts the batch) and returned in input order,
    /// whatever the completion order. Each call uses its own gate, so
    /// concurrent batches do not throttle each other.
    pub async fn download_concurrent(
        &self,
        urls: &[String],
        options: DownloadOptions,
    ) -> Vec<Result<RequestResult>> {
        let max_concurrency = options
            .max_concurrency
            .filter(|&n| n > 0)
            .unwrap_or(self.config.max_concurrency);
        let gate = ConcurrencyGate::new(max_concurrency);

        tracing::debug!(urls = urls.len(), max_concurrency, "batch download started");

        let handles: Vec<_> = urls
            .iter()
            .map(|url| {
                let syncer = self.clone();
                let url = url.clone();
                let request = options.request.clone();
                let proxies = options.proxies.clone();
                gate.submit(move || async move {
                    syncer.request_with_proxy(&url, request, &proxies).await
                })
            })
            .collect();

        let results: Vec<Result<RequestResult>> = join_all(handles)
            .await
            .into_iter()
            .map(|settled| settled.and_then(|outcome| outcome))
            .collect();

        let succeeded = results
            .iter()
            .filter(|r| r.as_ref().is_ok_and(RequestResult::is_success))
            .count();
        tracing::debug!(total = results.len(), succeeded, "batch download finished");

        results
    }

    /// Upload `payload` to every target at once
    ///
    /// Binary payloads are sent verbatim. Structured payloads get the
    /// target's `branch` and `sha` merged in and are sent as JSON. Headers
    /// layer as (JSON content type), target headers, caller headers, with
    /// later layers winning. The method is the caller's, else the target's,
    /// else POST.
    ///
    /// Every result is tagged with the target's name (unless the caller set
    /// `options.platform`, which takes precedence) and results are returned
    /// in target order. Per-target errors become failure records.
    pub async fn upload_parallel(
        &self,
        payload: &UploadPayload,
        targets: &[PlatformTarget],
        options: RequestOptions,
    ) -> Vec<RequestResult> {
        let uploads = targets
            .iter()
            .map(|target| self.upload_one(payload, target, options.clone()));
        let results = join_all(uploads).await;

        tracing::debug!(
            targets = targets.len(),
            succeeded = results.iter().filter(|r| r.is_success()).count(),
            "parallel upload finished"
        );
        results
    }

    async fn upload_one(
        &self,
        payload: &UploadPayload,
        target: &PlatformTarget,
        options: RequestOptions,
    ) -> RequestResult {
        let outcome = match upload_options(payload, target, options) {
            Ok(options) => self.request(&target.url, options).await,
            Err(e) => Err(e),
        };

        let mut result = outcome.unwrap_or_else(|e| {
            tracing::warn!(platform = %target.name, url = %target.url, error = %e, "upload errored");
            RequestResult::failure(&target.url, e.result_code(), e.to_string())
        });
        if result.platform.is_none() {
            result.platform = Some(target.name.clone());
        }
        result
    }
}

const JSON_CONTENT_TYPE: &str = "application/json";

/// Build the per-target request options for an upload
fn upload_options(
    payload: &UploadPayload,
    target: &PlatformTarget,
    mut options: RequestOptions,
) -> Result<RequestOptions> {
    match payload {
        UploadPayload::Binary(bytes) => {
            options.body = Some(bytes.clone());
            options.headers = merge_headers(&target.headers, &options.headers);
        }
        UploadPayload::Structured(fields) => {
            let mut body = fields.clone();
            if let Some(branch) = target.branch.as_ref().filter(|b| !b.is_empty()) {
                body.insert("branch".to_string(), Value::String(branch.clone()));
            }
            if let Some(sha) = target.sha.as_ref().filter(|s| !s.is_empty()) {
                body.insert("sha".to_string(), Value::String(sha.clone()));
            }
            options.body = Some(Bytes::from(serde_json::to_vec(&Value::Object(body))?));

            let mut base = Headers::new();
            base.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
            let base = merge_headers(&base, &target.headers);
            options.headers = merge_headers(&base, &options.headers);
        }
    }
    options.method = Some(
        options
            .method
            .or(target.method)
            .unwrap_or(HttpMethod::Post),
    );
    Ok(options)
}

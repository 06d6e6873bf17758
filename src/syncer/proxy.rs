//! Sequential proxy fallback.

use crate::error::Result;
use crate::types::{ProxyEntry, RequestOptions, RequestResult};
use url::Url;

use super::Syncer;

/// Message recorded when no proxy attempt produced a result
pub const ALL_PROXIES_FAILED_MESSAGE: &str = "all proxies failed";

impl ProxyEntry {
    /// Build the URL to request through this proxy
    ///
    /// Bare prefixes and `prefix = true` hosts get the full original URL
    /// appended verbatim; other hosts get only its path, query and fragment.
    ///
    /// # Examples
    ///
    /// ```
    /// use fetch_syncer::ProxyEntry;
    ///
    /// let full = ProxyEntry::Host { url: "https://proxy.example".into(), prefix: true };
    /// assert_eq!(
    ///     full.proxied_url("https://api.example/x?y=1").unwrap(),
    ///     "https://proxy.examplehttps://api.example/x?y=1"
    /// );
    ///
    /// let host = ProxyEntry::Host { url: "https://proxy.example".into(), prefix: false };
    /// assert_eq!(
    ///     host.proxied_url("https://api.example/x?y=1").unwrap(),
    ///     "https://proxy.example/x?y=1"
    /// );
    /// ```
    pub fn proxied_url(&self, original: &str) -> Result<String> {
        match self {
            ProxyEntry::Prefix(prefix) => Ok(format!("{prefix}{original}")),
            ProxyEntry::Host { url, prefix: true } => Ok(format!("{url}{original}")),
            ProxyEntry::Host { url, prefix: false } => {
                let parsed = Url::parse(original)?;
                let mut proxied = format!("{url}{}", parsed.path());
                if let Some(query) = parsed.query().filter(|q| !q.is_empty()) {
                    proxied.push('?');
                    proxied.push_str(query);
                }
                if let Some(fragment) = parsed.fragment().filter(|f| !f.is_empty()) {
                    proxied.push('#');
                    proxied.push_str(fragment);
                }
                Ok(proxied)
            }
        }
    }
}

impl Syncer {
    /// Request `url` through each proxy in turn until one succeeds
    ///
    /// With no proxies this is exactly [`request`](Self::request). Otherwise
    /// each attempt uses the client's `proxy_timeout` unless `options.timeout`
    /// is set, and the first result with a 2xx code is returned. When every
    /// proxy fails, the last attempt's result is returned.
    ///
    /// Attempts that error (unparseable original URL, failing after hook)
    /// are recorded as failure results carrying the proxy's URL and never
    /// abort the fallback.
    pub async fn request_with_proxy(
        &self,
        url: &str,
        options: RequestOptions,
        proxies: &[ProxyEntry],
    ) -> Result<RequestResult> {
        if proxies.is_empty() {
            return self.request(url, options).await;
        }

        let mut options = options;
        options.timeout.get_or_insert(self.config.proxy_timeout);

        let mut last_failure: Option<RequestResult> = None;
        for (index, proxy) in proxies.iter().enumerate() {
            let attempt = match proxy.proxied_url(url) {
                Ok(proxied) => self.request(&proxied, options.clone()).await,
                Err(e) => Err(e),
            };

            match attempt {
                Ok(result) if result.is_success() => {
                    tracing::debug!(url = %url, proxy = proxy.url(), index, "proxy succeeded");
                    return Ok(result);
                }
                Ok(result) => {
                    tracing::warn!(
                        url = %url,
                        proxy = proxy.url(),
                        code = ?result.code,
                        msg = %result.msg,
                        "proxy attempt failed"
                    );
                    last_failure = Some(result);
                }
                Err(e) => {
                    tracing::warn!(url = %url, proxy = proxy.url(), error = %e, "proxy attempt errored");
                    last_failure = Some(RequestResult::failure(
                        proxy.url(),
                        e.result_code(),
                        e.to_string(),
                    ));
                }
            }
        }

        Ok(last_failure.unwrap_or_else(|| {
            RequestResult::failure(url, crate::error::GENERIC_FAILURE_CODE, ALL_PROXIES_FAILED_MESSAGE)
        }))
    }
}

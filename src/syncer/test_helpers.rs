//! Shared test helpers: an in-memory scripted transport and Syncer constructors.

use crate::config::SyncerConfig;
use crate::error::TransportError;
use crate::syncer::Syncer;
use crate::transport::{Transport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How the scripted transport answers a URL
#[derive(Clone, Debug)]
pub(crate) enum Reply {
    /// Respond with a status, optional content type and body after `delay`
    Status {
        status: u16,
        content_type: Option<&'static str>,
        body: &'static [u8],
        delay: Duration,
    },
    /// Fail with a transport error
    Error { code: Option<i32>, message: String },
    /// Never respond; only cancellation ends the call
    Hang,
}

impl Reply {
    pub(crate) fn ok(body: &'static [u8]) -> Self {
        Reply::Status {
            status: 200,
            content_type: Some("text/plain"),
            body,
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn status(status: u16) -> Self {
        Reply::Status {
            status,
            content_type: None,
            body: b"",
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn delayed(self, by: Duration) -> Self {
        match self {
            Reply::Status {
                status,
                content_type,
                body,
                ..
            } => Reply::Status {
                status,
                content_type,
                body,
                delay: by,
            },
            other => other,
        }
    }
}

/// In-memory transport answering from a URL table
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<String, Reply>>,
    fallback: Reply,
    calls: Mutex<Vec<TransportRequest>>,
    tokens: Mutex<Vec<CancellationToken>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(HashMap::new()),
            fallback: Reply::status(404),
            calls: Mutex::new(Vec::new()),
            tokens: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub(crate) fn route(&self, url: impl Into<String>, reply: Reply) {
        self.routes.lock().unwrap().insert(url.into(), reply);
    }

    pub(crate) fn calls(&self) -> Vec<TransportRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn called_urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.url).collect()
    }

    pub(crate) fn tokens(&self) -> Vec<CancellationToken> {
        self.tokens.lock().unwrap().clone()
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: TransportRequest,
        cancel: CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        let reply = self
            .routes
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());
        self.calls.lock().unwrap().push(request);
        self.tokens.lock().unwrap().push(cancel.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        match reply {
            Reply::Status {
                status,
                content_type,
                body,
                delay,
            } => {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(TransportError::Aborted),
                    _ = tokio::time::sleep(delay) => {}
                }
                let mut headers = HeaderMap::new();
                if let Some(content_type) = content_type {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
                }
                headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
                Ok(TransportResponse::from_bytes(status, headers, body))
            }
            Reply::Error { code, message } => Err(TransportError::Other { code, message }),
            Reply::Hang => {
                cancel.cancelled().await;
                Err(TransportError::Aborted)
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Create a Syncer with default config over a fresh scripted transport
pub(crate) fn create_test_syncer() -> (Syncer, Arc<ScriptedTransport>) {
    create_test_syncer_with(SyncerConfig::default())
}

/// Create a Syncer with the given config over a fresh scripted transport
pub(crate) fn create_test_syncer_with(config: SyncerConfig) -> (Syncer, Arc<ScriptedTransport>) {
    let transport = ScriptedTransport::new();
    let syncer = Syncer::with_transport(config, transport.clone()).unwrap();
    (syncer, transport)
}

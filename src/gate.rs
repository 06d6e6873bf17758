//! Bounded-concurrency FIFO admission queue
//!
//! [`ConcurrencyGate`] caps how many submitted tasks run at once. Tasks are
//! admitted strictly in submission order; every time a running task settles
//! its slot is offered to the oldest queued task, so a backlog drains without
//! any further action from the caller.
//!
//! # Example
//!
//! ```no_run
//! use fetch_syncer::gate::ConcurrencyGate;
//!
//! # async fn example() -> fetch_syncer::Result<()> {
//! let gate = ConcurrencyGate::new(2);
//! let handles: Vec<_> = (0..10u64)
//!     .map(|i| gate.submit(move || async move { i * 2 }))
//!     .collect();
//!
//! for handle in handles {
//!     let value = handle.await?;
//!     println!("{value}");
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Concurrency bound used when none (or zero) is given
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

/// A queued task, already wired to deliver its outcome
type QueueEntry = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

struct GateState {
    running: usize,
    queue: VecDeque<QueueEntry>,
}

struct GateInner {
    max_concurrency: usize,
    state: Mutex<GateState>,
}

/// FIFO admission controller bounding simultaneously running tasks
///
/// Cloning yields another handle to the same gate. Admitted tasks run as
/// spawned tokio tasks, so submission must happen inside a tokio runtime.
#[derive(Clone)]
pub struct ConcurrencyGate {
    inner: Arc<GateInner>,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `max_concurrency` tasks at once
    ///
    /// Zero is treated as [`DEFAULT_MAX_CONCURRENCY`]. The bound cannot be
    /// changed afterwards.
    #[must_use]
    pub fn new(max_concurrency: usize) -> Self {
        let max_concurrency = if max_concurrency == 0 {
            DEFAULT_MAX_CONCURRENCY
        } else {
            max_concurrency
        };
        Self {
            inner: Arc::new(GateInner {
                max_concurrency,
                state: Mutex::new(GateState {
                    running: 0,
                    queue: VecDeque::new(),
                }),
            }),
        }
    }

    /// The fixed concurrency bound
    pub fn max_concurrency(&self) -> usize {
        self.inner.max_concurrency
    }

    /// Number of tasks currently running
    pub fn running(&self) -> usize {
        self.lock().running
    }

    /// Number of tasks waiting for a slot
    pub fn queued(&self) -> usize {
        self.lock().queue.len()
    }

    /// Queue `task` and return a handle resolving to its output
    ///
    /// The task is started as soon as a slot is free. A panicking task
    /// resolves its handle with [`Error::TaskPanicked`] and frees its slot
    /// like any other settlement.
    pub fn submit<F, Fut, T>(&self, task: F) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let entry: QueueEntry = Box::new(move || {
            async move {
                let outcome = AssertUnwindSafe(async move { task().await })
                    .catch_unwind()
                    .await
                    .map_err(|_| {
                        tracing::warn!("gate task panicked");
                        Error::TaskPanicked
                    });
                // The caller may have dropped the handle; the outcome is then discarded
                let _ = tx.send(outcome);
            }
            .boxed()
        });

        self.lock().queue.push_back(entry);
        self.dispatch();
        TaskHandle { rx }
    }

    /// Admit queued tasks while slots are free
    fn dispatch(&self) {
        loop {
            let entry = {
                let mut state = self.lock();
                if state.running >= self.inner.max_concurrency {
                    return;
                }
                let Some(entry) = state.queue.pop_front() else {
                    return;
                };
                state.running += 1;
                entry
            };

            let gate = self.clone();
            tokio::spawn(async move {
                entry().await;
                gate.release();
            });
        }
    }

    fn release(&self) {
        {
            let mut state = self.lock();
            state.running = state.running.saturating_sub(1);
        }
        self.dispatch();
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        // No user code runs under this lock, so a poisoned state is still consistent
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ConcurrencyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ConcurrencyGate")
            .field("max_concurrency", &self.inner.max_concurrency)
            .field("running", &state.running)
            .field("queued", &state.queue.len())
            .finish()
    }
}

/// Future resolving to the output of a task submitted to a [`ConcurrencyGate`]
///
/// Dropping the handle does not cancel the task.
#[must_use = "a TaskHandle does nothing unless awaited"]
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::TaskDropped)),
            Poll::Pending => Poll::Pending,
        }
    }
}

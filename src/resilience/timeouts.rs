//! Timeout enforcement.
//!
//! # Responsibilities
//! - Race any remote operation against a deadline
//! - Report the caller's description of what timed out
//! - Release the deadline timer on every exit path
//!
//! # Design Decisions
//! - Uses Tokio's timer facilities directly (`select!` over operation and sleep)
//! - Timeout errors are distinct from the operation's own errors
//! - On timeout the operation future is dropped; nothing is sent to the node

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// The deadline elapsed before the operation finished.
///
/// Carries the caller-supplied description verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TimedOut(pub String);

/// Runs operations under a deadline.
///
/// Cloning is cheap; clones share the armed-timer counter.
#[derive(Debug, Clone)]
pub struct Invoker {
    ceiling: Duration,
    armed: Arc<AtomicUsize>,
}

/// Decrements the armed-timer counter when the race ends, however it ends.
struct Disarm<'a>(&'a AtomicUsize);

impl Drop for Disarm<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Invoker {
    /// Create an invoker whose default deadline is `ceiling`.
    pub fn new(ceiling: Duration) -> Self {
        Self {
            ceiling,
            armed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Number of deadline timers currently armed by this invoker (and its clones).
    pub fn armed_timers(&self) -> usize {
        self.armed.load(Ordering::SeqCst)
    }

    /// Call `operation(args)` and wait at most the default ceiling.
    pub async fn invoke<Op, Args, Fut, T, E>(
        &self,
        operation: Op,
        args: Args,
        timeout_message: &str,
    ) -> Result<T, E>
    where
        Op: FnOnce(Args) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TimedOut>,
    {
        self.invoke_within(self.ceiling, operation, args, timeout_message).await
    }

    /// Call `operation(args)` and wait at most `timeout`.
    pub async fn invoke_within<Op, Args, Fut, T, E>(
        &self,
        timeout: Duration,
        operation: Op,
        args: Args,
        timeout_message: &str,
    ) -> Result<T, E>
    where
        Op: FnOnce(Args) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TimedOut>,
    {
        self.race(timeout, operation(args), timeout_message).await
    }

    /// Await an already-built operation under the default ceiling.
    pub async fn run<Fut, T, E>(&self, operation: Fut, timeout_message: &str) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: From<TimedOut>,
    {
        self.race(self.ceiling, operation, timeout_message).await
    }

    async fn race<Fut, T, E>(&self, timeout: Duration, operation: Fut, timeout_message: &str) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: From<TimedOut>,
    {
        self.armed.fetch_add(1, Ordering::SeqCst);
        let _disarm = Disarm(&self.armed);

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(operation);
        tokio::pin!(deadline);

        tokio::select! {
            biased;
            outcome = &mut operation => outcome,
            _ = &mut deadline => {
                tracing::debug!(
                    timeout_ms = timeout.as_millis() as u64,
                    message = timeout_message,
                    "Deadline elapsed before operation completed"
                );
                Err(E::from(TimedOut(timeout_message.to_string())))
            }
        }
    }
}

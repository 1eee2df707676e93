//! Constant-delay retry for fallible async operations.
//!
//! The policy itself is plain data. [`retry_async`] drives one operation
//! through it, and [`with_retry`] turns an operation into a retrying one that
//! can be handed to anything expecting `Fn(T) -> Future`.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one (minimum 1).
    pub max_attempts: u32,

    /// Fixed delay between a failed attempt and the next one.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::constant(Duration::from_secs(2), 3)
    }
}

impl RetryPolicy {
    /// Create a policy that waits `delay` between at most `max_attempts` attempts.
    pub fn constant(delay: Duration, max_attempts: u32) -> Self {
        Self { max_attempts: max_attempts.max(1), delay }
    }

    /// Create a policy with a single attempt (fail fast).
    pub fn no_retry() -> Self {
        Self::constant(Duration::ZERO, 1)
    }

    /// Delay to wait after the given (1-based) failed attempt.
    ///
    /// Returns `None` once the attempt budget is spent.
    pub fn next_delay(&self, failed_attempt: u32) -> Option<Duration> {
        if failed_attempt >= self.max_attempts {
            None
        } else {
            Some(self.delay)
        }
    }
}

/// Result of a retry operation.
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final result (success or last error).
    pub result: Result<T, E>,

    /// Number of attempts made.
    pub attempts: u32,

    /// Total time spent (including delays).
    pub total_time: Duration,
}

impl<T, E> RetryResult<T, E> {
    /// Check if the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Whether more than one attempt was needed.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Get the result.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Retry an async operation with the given policy.
pub async fn retry_async<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;
        let result = operation().await;

        let delay = match &result {
            Ok(_) => None,
            Err(e) => {
                let next = policy.next_delay(attempts);
                if next.is_some() {
                    tracing::warn!(attempt = attempts, max = policy.max_attempts, error = %e, "Attempt failed, retrying");
                }
                next
            }
        };

        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => return RetryResult { result, attempts, total_time: start.elapsed() },
        }
    }
}

/// Wrap `operation` so every call runs through `policy`.
///
/// The input is cloned for each attempt.
pub fn with_retry<I, T, E, F, Fut>(
    policy: RetryPolicy,
    operation: F,
) -> impl Fn(I) -> BoxFuture<'static, RetryResult<T, E>> + Clone + Send + Sync + 'static
where
    I: Clone + Send + 'static,
    T: Send + 'static,
    E: std::fmt::Display + Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let operation = Arc::new(operation);
    move |input: I| {
        let operation = Arc::clone(&operation);
        async move { retry_async(&policy, move || operation(input.clone())).await }.boxed()
    }
}

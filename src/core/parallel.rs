//! Bounded-concurrency worker pool.
//!
//! Tasks are pushed onto an unbounded queue with [`WorkerPool::dispatch`] and
//! picked up by a dispatcher that keeps at most `workers` operations in flight.
//! Every operation runs through the configured [`RetryPolicy`]; each task
//! produces exactly one [`TaskOutcome`] on the outcome channel.
//!
//! Dropping the pool aborts the dispatcher, which in turn aborts every
//! in-flight operation.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use super::retry::{with_retry, RetryPolicy, RetryResult};

/// Outcome of one dispatched task.
#[derive(Debug)]
pub enum TaskOutcome<T, R> {
    /// The operation succeeded (possibly after retries).
    Completed {
        task: T,
        output: R,
        attempts: u32,
        elapsed: Duration,
    },
    /// Every attempt failed; `error` is the last one.
    Failed {
        task: T,
        attempts: u32,
        error: anyhow::Error,
    },
}

impl<T, R> TaskOutcome<T, R> {
    /// The task this outcome belongs to.
    pub fn task(&self) -> &T {
        match self {
            Self::Completed { task, .. } | Self::Failed { task, .. } => task,
        }
    }

    /// Check if the task completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of operations in flight.
    pub workers: usize,
    /// Retry policy applied to each operation.
    pub retry: RetryPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { workers: 2, retry: RetryPolicy::default() }
    }
}

impl PoolConfig {
    /// Create a new pool config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum concurrency.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

type RetryingOp<T, R> =
    Arc<dyn Fn(T) -> BoxFuture<'static, RetryResult<R, anyhow::Error>> + Send + Sync>;

/// A running pool bound to one operation.
pub struct WorkerPool<T, R> {
    queue: Option<mpsc::UnboundedSender<T>>,
    outcomes: mpsc::UnboundedReceiver<TaskOutcome<T, R>>,
    dispatcher: JoinHandle<()>,
    in_flight: Arc<AtomicUsize>,
    dispatched: usize,
    config: PoolConfig,
}

impl<T, R> WorkerPool<T, R>
where
    T: Clone + fmt::Display + Send + 'static,
    R: Send + 'static,
{
    /// Start a pool that runs `operation` for every dispatched task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(config: PoolConfig, operation: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let guarded = move |task: T| {
            let fut = operation(task);
            async move {
                AssertUnwindSafe(fut).catch_unwind().await.unwrap_or_else(|panic| {
                    Err(anyhow::anyhow!("operation panicked: {}", panic_message(panic.as_ref())))
                })
            }
        };
        let op: RetryingOp<T, R> = Arc::new(with_retry(config.retry, guarded));

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let dispatcher = tokio::spawn(dispatch_loop(
            queue_rx,
            outcome_tx,
            op,
            config.workers.max(1),
            Arc::clone(&in_flight),
        ));

        tracing::debug!(workers = config.workers, "Worker pool started");

        Self {
            queue: Some(queue_tx),
            outcomes: outcome_rx,
            dispatcher,
            in_flight,
            dispatched: 0,
            config,
        }
    }

    /// Enqueue a task. Never waits for a free worker.
    pub fn dispatch(&mut self, task: T) -> anyhow::Result<()> {
        let queue =
            self.queue.as_ref().ok_or_else(|| anyhow::anyhow!("worker pool is closed"))?;
        tracing::debug!(task = %task, "Dispatching task");
        queue.send(task).map_err(|_| anyhow::anyhow!("worker pool dispatcher has stopped"))?;
        self.dispatched += 1;
        Ok(())
    }

    /// Stop accepting tasks. Already queued tasks still run.
    pub fn close(&mut self) {
        self.queue = None;
    }

    /// Wait for the next finished task.
    ///
    /// Returns `None` once the pool is closed and every dispatched task has
    /// reported.
    pub async fn next_outcome(&mut self) -> Option<TaskOutcome<T, R>> {
        self.outcomes.recv().await
    }

    /// Number of operations currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Number of tasks dispatched so far.
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// The settings this pool runs with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Abort the dispatcher and every in-flight operation.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl<T, R> Drop for WorkerPool<T, R> {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

async fn dispatch_loop<T, R>(
    mut queue: mpsc::UnboundedReceiver<T>,
    outcomes: mpsc::UnboundedSender<TaskOutcome<T, R>>,
    op: RetryingOp<T, R>,
    workers: usize,
    in_flight: Arc<AtomicUsize>,
) where
    T: Clone + fmt::Display + Send + 'static,
    R: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut running = JoinSet::new();

    while let Some(task) = queue.recv().await {
        while running.try_join_next().is_some() {}

        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };

        let op = Arc::clone(&op);
        let outcomes = outcomes.clone();
        let in_flight = Arc::clone(&in_flight);

        running.spawn(async move {
            let _permit = permit;
            in_flight.fetch_add(1, Ordering::SeqCst);
            let start = Instant::now();

            let RetryResult { result, attempts, .. } = op(task.clone()).await;

            in_flight.fetch_sub(1, Ordering::SeqCst);
            let outcome = match result {
                Ok(output) => {
                    TaskOutcome::Completed { task, output, attempts, elapsed: start.elapsed() }
                }
                Err(error) => {
                    tracing::error!(task = %task, attempts, error = %error, "Task exhausted retries");
                    TaskOutcome::Failed { task, attempts, error }
                }
            };
            let _ = outcomes.send(outcome);
        });
    }

    while running.join_next().await.is_some() {}
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

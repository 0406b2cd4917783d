//! Parallel create/wait/delete orchestration.
//!
//! Creates every task sequentially, waits for all of them concurrently and
//! deletes each one as soon as its wait returns, all under one deadline.

use crate::collector::{CollectError, collect_n};
use prepull_core::{PrepullError, Result, TaskExecutor, TaskId};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

/// Roughly 30 years; stands in for a timeout too large to add to `now`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `now + timeout`, saturating at [`FAR_FUTURE`] instead of overflowing.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Drives a [`TaskExecutor`] through create → parallel wait → cleanup.
///
/// The timeout starts counting when [`run`](Self::run) is called and bounds
/// the whole wait-and-cleanup phase, not each task.
pub struct ParallelPrepuller<E: ?Sized> {
    executor: Arc<E>,
    timeout: Duration,
    max_concurrent_waits: Option<usize>,
}

impl<E> ParallelPrepuller<E>
where
    E: TaskExecutor + ?Sized + 'static,
{
    pub fn new(executor: Arc<E>, timeout: Duration) -> Self {
        Self {
            executor,
            timeout,
            max_concurrent_waits: None,
        }
    }

    /// Bounds how many `wait` calls run at once. Every worker is still
    /// spawned up front; the extra ones queue on a semaphore.
    pub fn with_max_concurrent_waits(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_waits = limit.filter(|l| *l > 0);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the full protocol for `tasks`.
    ///
    /// # Errors
    ///
    /// - `CreationFailed`: the first failing `create`; nothing is waited on
    ///   or deleted, including tasks already created.
    /// - `TimeoutExceeded`: the deadline fired before every task was
    ///   cleaned up; `outstanding` lists the rest in input order.
    /// - `CleanupFailed`: the first failing `delete`; later completions are
    ///   left unprocessed.
    ///
    /// On every error path the remaining wait workers are aborted before
    /// this returns.
    pub async fn run(&self, tasks: &[TaskId]) -> Result<()> {
        let span = info_span!("prepull", tasks = tasks.len(), timeout = ?self.timeout);
        self.run_phases(tasks).instrument(span).await
    }

    async fn run_phases(&self, tasks: &[TaskId]) -> Result<()> {
        info!(
            "[upgrade/prepull] Will prepull images for components {:?}",
            tasks.iter().map(TaskId::as_str).collect::<Vec<_>>()
        );

        let deadline = deadline_after(self.timeout);

        // Synchronously create the resources
        for task in tasks {
            self.executor
                .create(task)
                .await
                .map_err(|e| PrepullError::creation_failed(task, e))?;
            debug!(task = %task, "created");
        }

        let (tx, mut rx) = mpsc::channel(tasks.len().max(1));
        let mut workers = self.spawn_waiters(tasks, tx);

        let executor = Arc::clone(&self.executor);
        let result = collect_n(deadline, &mut rx, tasks.len(), |task: TaskId| {
            let executor = Arc::clone(&executor);
            async move {
                executor
                    .delete(&task)
                    .await
                    .map_err(|e| PrepullError::cleanup_failed(&task, e))?;
                info!("[upgrade/prepull] Prepulled image for component {}.", task);
                Ok::<(), PrepullError>(())
            }
        })
        .await;

        workers.abort_all();

        match result {
            Ok(()) => {
                info!(
                    "[upgrade/prepull] Successfully prepulled the images for all the control plane components"
                );
                Ok(())
            }
            Err(CollectError::DeadlineExceeded { received }) => {
                let done: HashSet<&TaskId> = received.iter().collect();
                let outstanding: Vec<TaskId> = tasks
                    .iter()
                    .filter(|t| !done.contains(t))
                    .cloned()
                    .collect();
                warn!(outstanding = ?outstanding, "[upgrade/prepull] The prepull operation timed out");
                Err(PrepullError::timeout(self.timeout, outstanding))
            }
            Err(CollectError::Signal(err)) => {
                warn!(error = %err, "[upgrade/prepull] Cleanup failed");
                Err(err)
            }
        }
    }

    /// Starts one wait worker per task. Each worker reports its task on `tx`
    /// once `wait` returns; the channel holds one slot per task so a send
    /// never blocks.
    fn spawn_waiters(&self, tasks: &[TaskId], tx: mpsc::Sender<TaskId>) -> JoinSet<()> {
        let limiter = self
            .max_concurrent_waits
            .map(|limit| Arc::new(Semaphore::new(limit)));
        let mut workers = JoinSet::new();

        for task in tasks.iter().cloned() {
            let executor = Arc::clone(&self.executor);
            let tx = tx.clone();
            let limiter = limiter.clone();
            let span = info_span!("wait", task = %task);

            workers.spawn(
                async move {
                    let _permit = match limiter {
                        Some(semaphore) => semaphore.acquire_owned().await.ok(),
                        None => None,
                    };
                    executor.wait(&task).await;
                    debug!("ready");
                    // The collector may already have given up
                    let _ = tx.send(task).await;
                }
                .instrument(span),
            );
        }

        workers
    }
}

/// Convenience wrapper: creates tasks synchronously, waits in parallel and
/// cleans up each task as it becomes ready, all within `timeout`.
pub async fn prepull_in_parallel<E>(
    executor: Arc<E>,
    timeout: Duration,
    tasks: &[TaskId],
) -> Result<()>
where
    E: TaskExecutor + ?Sized + 'static,
{
    ParallelPrepuller::new(executor, timeout).run(tasks).await
}

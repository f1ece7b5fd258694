//! # TaskScheduler: cancellable one-shot and repeating jobs.
//!
//! ## Architecture
//! ```text
//! schedule_once(delay, job) ──► tokio::spawn ──► sleep(delay) ──► run ──► done
//! schedule_repeating(initial, period, job)
//!                           ──► tokio::spawn ──► sleep(initial)
//!                                 loop {
//!                                   ├─► run body
//!                                   │     └─ Err / panic ──► log, fail-stop
//!                                   └─► sleep(period)   (cancellable)
//!                                 }
//! cancel(handle) ────► child token cancelled, no further executions
//! scope cancelled ───► every child token cancelled as a unit
//! ```
//!
//! ## Rules
//! - **Closed scope**: scheduling after the scope is cancelled fails with
//!   [`SchedulerError::Closed`]; nothing is spawned.
//! - **Fail-stop per job**: a repeating body that errors or panics is logged
//!   with its name and cancelled; sibling jobs keep running (same isolation
//!   policy as dispatch handlers).
//! - **Prompt shutdown**: cancelling the scope cancels every child token;
//!   sleeping drivers wake immediately and no further bodies run.
//! - **Sequential runs**: one repeating job never overlaps itself; the
//!   period sleep starts after the body completes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::SchedulerError;
use crate::scheduler::job::JobRef;

/// Opaque handle to a scheduled job, used for cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

type JobMap = Arc<Mutex<HashMap<u64, CancellationToken>>>;

/// Scheduler owning a cancellable scope of delayed and repeating jobs.
pub struct TaskScheduler {
    scope: CancellationToken,
    jobs: JobMap,
    next_id: AtomicU64,
}

impl TaskScheduler {
    /// Creates a scheduler with its own root scope.
    pub fn new() -> Self {
        Self::with_scope(CancellationToken::new())
    }

    /// Creates a scheduler whose scope is the given token, typically a child
    /// of a host lifecycle scope so shutdown cancels everything as a unit.
    pub fn with_scope(scope: CancellationToken) -> Self {
        Self {
            scope,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Schedules a one-shot job after `delay`.
    ///
    /// The job is destroyed on completion; the returned handle can cancel it
    /// before it fires. Fails with [`SchedulerError::Closed`] once the scope
    /// is cancelled.
    pub fn schedule_once(
        &self,
        delay: Duration,
        job: JobRef,
    ) -> Result<TaskHandle, SchedulerError> {
        let (id, token) = self.admit()?;
        let jobs = Arc::clone(&self.jobs);

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = time::sleep(delay) => {
                    run_guarded(&job, &token).await;
                }
            }
            lock(&jobs).remove(&id);
        });

        Ok(TaskHandle(id))
    }

    /// Schedules a repeating job: first run after `initial_delay`, then every
    /// `period` after the previous run completes.
    ///
    /// The job stops on [`cancel`](Self::cancel), on scope shutdown, or by
    /// fail-stop when its body errors. Fails with [`SchedulerError::Closed`]
    /// once the scope is cancelled.
    pub fn schedule_repeating(
        &self,
        initial_delay: Duration,
        period: Duration,
        job: JobRef,
    ) -> Result<TaskHandle, SchedulerError> {
        let (id, token) = self.admit()?;
        let jobs = Arc::clone(&self.jobs);

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = time::sleep(initial_delay) => {
                    loop {
                        if token.is_cancelled() || !run_guarded(&job, &token).await {
                            break;
                        }
                        tokio::select! {
                            _ = token.cancelled() => break,
                            _ = time::sleep(period) => {}
                        }
                    }
                }
            }
            lock(&jobs).remove(&id);
        });

        Ok(TaskHandle(id))
    }

    /// Stops future executions of a scheduled job. Idempotent; unknown or
    /// finished handles are a no-op.
    pub fn cancel(&self, handle: TaskHandle) {
        if let Some(token) = lock(&self.jobs).remove(&handle.0) {
            token.cancel();
        }
    }

    /// Number of jobs currently owned by the scheduler.
    pub fn len(&self) -> usize {
        lock(&self.jobs).len()
    }

    /// True if no jobs are owned.
    pub fn is_empty(&self) -> bool {
        lock(&self.jobs).is_empty()
    }

    /// True once the scope has been cancelled.
    pub fn is_closed(&self) -> bool {
        self.scope.is_cancelled()
    }

    /// Cancels the scope: every pending and repeating job stops promptly and
    /// further scheduling fails with [`SchedulerError::Closed`].
    pub fn shutdown(&self) {
        self.scope.cancel();
        lock(&self.jobs).clear();
    }

    /// Admission check plus bookkeeping for a new job.
    fn admit(&self) -> Result<(u64, CancellationToken), SchedulerError> {
        if self.scope.is_cancelled() {
            return Err(SchedulerError::Closed);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = self.scope.child_token();
        lock(&self.jobs).insert(id, token.clone());
        Ok((id, token))
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one job body with isolation. Returns `false` if the job should stop
/// repeating (error or panic; fail-stop for that job only).
async fn run_guarded(job: &JobRef, token: &CancellationToken) -> bool {
    let fut = job.run(token.clone());
    match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(task = %job.name(), error = %e, label = e.as_label(), "job failed; canceling");
            false
        }
        Err(payload) => {
            let info = if let Some(msg) = payload.downcast_ref::<&'static str>() {
                (*msg).to_string()
            } else if let Some(msg) = payload.downcast_ref::<String>() {
                msg.clone()
            } else {
                "unknown panic".to_string()
            };
            warn!(task = %job.name(), panic = %info, "job panicked; canceling");
            false
        }
    }
}

fn lock(
    map: &Mutex<HashMap<u64, CancellationToken>>,
) -> std::sync::MutexGuard<'_, HashMap<u64, CancellationToken>> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

//! # Job abstraction and function-backed job implementation.
//!
//! This module defines the [`Job`] trait (async, cancelable) and a convenient
//! function-backed implementation [`JobFn`]. The common handle type is
//! [`JobRef`], an `Arc<dyn Job>` suitable for sharing across the runtime.
//!
//! A job receives a [`CancellationToken`] and should periodically check it to
//! stop cooperatively during shutdown.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::JobError;

/// Result type of job executions.
pub type JobResult = Result<(), JobError>;

/// Shared handle to a job.
pub type JobRef = Arc<dyn Job>;

/// # Asynchronous, cancelable unit of scheduled work.
///
/// A `Job` has a stable [`name`](Job::name) (used in failure logs) and an
/// async [`run`](Job::run) method that receives a [`CancellationToken`].
/// Implementors should regularly check cancellation and exit promptly during
/// shutdown.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Returns a stable, human-readable job name.
    fn name(&self) -> &str;

    /// Executes one run of the job until completion or cancellation.
    async fn run(&self, ctx: CancellationToken) -> JobResult;
}

/// Function-backed job implementation.
///
/// Wraps a closure that *creates* a new future per run, so repeating jobs
/// carry no hidden mutable state between runs; shared state goes through an
/// explicit `Arc` inside the closure.
///
/// ## Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use systemvisor::{JobError, JobFn, JobRef};
///
/// let j: JobRef = JobFn::arc("autosave", |ctx: CancellationToken| async move {
///     if ctx.is_cancelled() {
///         return Ok(());
///     }
///     // save the world...
///     Ok::<_, JobError>(())
/// });
/// assert_eq!(j.name(), "autosave");
/// ```
pub struct JobFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> JobFn<F> {
    /// Creates a new function-backed job.
    ///
    /// Prefer [`JobFn::arc`] when you immediately need a [`JobRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the job and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Job for JobFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JobResult> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken) -> JobResult {
        (self.f)(ctx).await
    }
}

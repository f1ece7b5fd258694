//! # Marshaling work onto the world loop.
//!
//! Scheduled jobs run on the tokio scope, concurrently with dispatch. Any job
//! that needs to read or mutate world state must hand that portion of work to
//! the world loop and await its completion; the scheduler itself provides no
//! implicit synchronization with dispatch.
//!
//! ## Architecture
//! ```text
//! job body (tokio scope)            world loop (single consumer)
//!   WorldHandle::run(f) ── mpsc ──►   f(&WorldView) between dispatches
//!         ▲                                  │
//!         └───────── oneshot result ◄────────┘
//! ```
//!
//! ## Rules
//! - Closures run **between** dispatches, never concurrently with one.
//! - A closed loop (shutdown) yields [`WorldClosed`], not a hang.
//! - The handle is cheap to clone; every clone feeds the same queue.

use tokio::sync::{mpsc, oneshot};

use crate::error::WorldClosed;
use crate::world::WorldView;

/// A unit of work executed on the world loop.
pub(crate) type WorldJob = Box<dyn FnOnce(&WorldView<'_>) + Send>;

/// Clonable handle for running closures on the world loop.
///
/// Obtained from [`LifecycleCoordinator::start`](crate::LifecycleCoordinator::start).
#[derive(Clone)]
pub struct WorldHandle {
    jobs: mpsc::Sender<WorldJob>,
}

impl WorldHandle {
    pub(crate) fn new(jobs: mpsc::Sender<WorldJob>) -> Self {
        Self { jobs }
    }

    /// Runs `f` on the world loop and awaits its result.
    ///
    /// The closure receives the same [`WorldView`] dispatch uses, so it may
    /// enumerate entities and queue mutations with full ordering safety.
    ///
    /// Returns [`WorldClosed`] if the loop has stopped (before or while the
    /// closure was queued).
    pub async fn run<R, F>(&self, f: F) -> Result<R, WorldClosed>
    where
        F: FnOnce(&WorldView<'_>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: WorldJob = Box::new(move |view| {
            let _ = tx.send(f(view));
        });
        self.jobs.send(job).await.map_err(|_| WorldClosed)?;
        rx.await.map_err(|_| WorldClosed)
    }
}

//! # Supervised task scheduling alongside dispatch.
//!
//! [`TaskScheduler`] owns a cancellable scope and runs one-shot delayed and
//! repeating [`Job`]s on tokio, independently of the world loop. Job bodies
//! that need world state marshal it through
//! [`WorldHandle::run`](crate::WorldHandle::run); the scheduler provides no
//! implicit synchronization with dispatch — timing is decoupled from
//! mutation so slow or many jobs never block gameplay simulation.

mod job;
mod scheduler;

pub use job::{Job, JobFn, JobRef, JobResult};
pub use scheduler::{TaskHandle, TaskScheduler};

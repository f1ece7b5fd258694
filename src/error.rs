//! Error types used by the systemvisor runtime.
//!
//! This module defines three main error enums:
//!
//! - [`ConfigError`] — wiring bugs detected at registration or order-build time.
//! - [`SchedulerError`] — scheduling against a scope that is already closed.
//! - [`JobError`] — errors raised by individual scheduled job executions.
//!
//! plus [`WorldClosed`], returned when marshaling work onto a world loop that
//! has already stopped.
//!
//! All enums provide `as_label()` for logging/metrics. Configuration errors
//! are surfaced immediately to the caller and never swallowed: they indicate a
//! bug in the consuming plugin, not a runtime condition to recover from.

use thiserror::Error;

use crate::systems::SystemKind;
use crate::world::SystemId;

/// # Errors caused by invalid system or dependency configuration.
///
/// Detected at registration time (duplicate ids, cycles, bad tick intervals)
/// or when an execution order is first built (unresolved dependency edges).
/// They abort plugin setup — fail fast, loud.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A system with the same id is already registered for that kind.
    #[error("system `{id}` is already registered for kind {kind}")]
    DuplicateId {
        /// Kind partition the duplicate was registered into.
        kind: SystemKind,
        /// The conflicting system id.
        id: SystemId,
    },

    /// The declared before/after edges form a cycle; no valid order exists.
    ///
    /// `ids` names every system on the cycle, not just the one whose
    /// registration completed it.
    #[error("dependency cycle between systems {ids:?}")]
    DependencyCycle {
        /// All system ids participating in the cycle, in registration order.
        ids: Vec<SystemId>,
    },

    /// A dependency edge references a system id that was never registered.
    ///
    /// The edge is accepted at registration time (declaration order between
    /// plugins must not matter) but becomes a hard error once an execution
    /// order is built while the target is still missing.
    #[error("system `{system}` depends on unregistered system `{missing}`")]
    UnresolvedDependency {
        /// The system that declared the edge.
        system: SystemId,
        /// The id the edge points at.
        missing: SystemId,
    },

    /// A tick system was registered with a non-positive interval.
    #[error("tick system `{id}` has invalid interval {interval} (must be > 0)")]
    InvalidInterval {
        /// The offending system id.
        id: SystemId,
        /// The rejected interval value.
        interval: u64,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::DuplicateId { .. } => "config_duplicate_id",
            ConfigError::DependencyCycle { .. } => "config_dependency_cycle",
            ConfigError::UnresolvedDependency { .. } => "config_unresolved_dependency",
            ConfigError::InvalidInterval { .. } => "config_invalid_interval",
        }
    }
}

/// # Errors produced by the task scheduler surface.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The owning scope was cancelled; no further jobs can be scheduled.
    #[error("scheduler scope is closed")]
    Closed,
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::Closed => "scheduler_closed",
        }
    }
}

/// # Errors produced by scheduled job executions.
///
/// A failing one-shot job is logged and dropped; a failing repeating job is
/// logged and cancelled (fail-stop for that job only, siblings keep running).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum JobError {
    /// Job body returned an error.
    #[error("job failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Job observed cancellation and exited early.
    #[error("job canceled")]
    Canceled,
}

impl JobError {
    /// Wraps an arbitrary error message.
    pub fn fail(error: impl Into<String>) -> Self {
        JobError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Fail { .. } => "job_failed",
            JobError::Canceled => "job_canceled",
        }
    }
}

/// The world loop is no longer running; marshaled work cannot be delivered.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("world loop is not running")]
pub struct WorldClosed;

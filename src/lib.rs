//! # systemvisor
//!
//! **Systemvisor** is a dispatch layer for simulation hosts: independently
//! authored handlers ("systems") react to runtime events and periodic ticks
//! with deterministic ordering from declared priorities and explicit
//! before/after dependencies.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  SystemSpec  │   │  SystemSpec  │   │  SystemSpec  │
//!     │ (plugin #1)  │   │ (plugin #2)  │   │ (plugin #3)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  SystemRegistry                                                   │
//! │  - one shelf per kind (entity / world / tick / damage)            │
//! │  - DependencyGraph per shelf (priority + before/after edges)      │
//! │  - cached execution orders, invalidated on registration changes   │
//! │  - per-handler failure isolation (Err and panics)                 │
//! └───────────────────────────────▲───────────────────────────────────┘
//!                                 │ dispatch (sequential, in order)
//! ┌───────────────────────────────┴───────────────────────────────────┐
//! │  world loop (one task, owned by LifecycleCoordinator)             │
//! └───▲──────────────────────▲────────────────────────────────────────┘
//!     │ Bus (broadcast)      │ WorldHandle::run (mpsc + oneshot)
//!     │                      │
//!   host events, ticks,    TaskScheduler jobs (concurrent, cancellable
//!   damage hooks           scope shared with the coordinator)
//! ```
//!
//! ### Lifecycle
//! ```text
//! LifecycleCoordinator::new(cfg, registry)
//!   └─► start(host)      (idempotent, one-shot latch)
//!         ├─► spawns the world loop
//!         └─► returns WorldHandle
//!   ...
//!   └─► shutdown()       (terminal)
//!         ├─► scope.cancel()   → world loop stops, every job stops
//!         └─► registry.clear() → no handler outlives the host
//! ```
//!
//! ## Ordering guarantees
//! Within one kind, systems run in the order produced by a stable
//! topological sort: every declared before/after edge is respected; among
//! unconstrained systems lower priority runs earlier, ties broken by
//! registration order. The order is deterministic and idempotent across
//! rebuilds. Cycles and unresolved dependency targets are configuration
//! errors, surfaced loudly — never silently reordered.
//!
//! ## Failure isolation
//! A handler that returns `Err` or panics is caught at the dispatch
//! boundary, logged with its system id, and never stops later systems; a
//! repeating job whose body fails is logged and fail-stopped without
//! touching sibling jobs. One broken feature must not disable unrelated
//! gameplay logic.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use systemvisor::{
//!     Config, LifecycleCoordinator, SystemRegistry, SystemSpec, ComponentQuery,
//! };
//! # use systemvisor::{CommandBuffer, ComponentKey, EntityId, EntityStore, HostWorld};
//! # struct World;
//! # impl EntityStore for World {
//! #     fn select(&self, _q: &ComponentQuery) -> Vec<EntityId> { vec![] }
//! # }
//! # impl CommandBuffer for World {
//! #     fn as_any(&self) -> &dyn std::any::Any { self }
//! # }
//! # impl HostWorld for World {
//! #     fn store(&self) -> &dyn EntityStore { self }
//! #     fn commands(&self) -> &dyn CommandBuffer { self }
//! # }
//!
//! struct TimeChange { dawn: bool }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let registry = Arc::new(SystemRegistry::new());
//!     registry
//!         .register(
//!             SystemSpec::on_entity_event::<TimeChange, _>("dawn-greeter", |ctx, _ev| {
//!                 // queue a greeting for ctx.entity through ctx.commands
//!                 Ok(())
//!             })
//!             .query(ComponentQuery::with(["greeting"]))
//!             .filter(|ev: &TimeChange| ev.dawn),
//!         )
//!         .unwrap();
//!
//!     let coordinator = LifecycleCoordinator::new(Config::default(), registry);
//!     let _world = coordinator.start(Arc::new(World));
//!     coordinator.bus().publish_event(TimeChange { dawn: true });
//!     // ...
//!     coordinator.shutdown();
//! }
//! ```

mod config;
mod error;
mod events;
mod graph;
mod lifecycle;
mod limiter;
mod registry;
mod scheduler;
mod systems;
mod world;

// ---- Public re-exports ----

pub use config::Config;
pub use error::{ConfigError, JobError, SchedulerError, WorldClosed};
pub use events::{Bus, DamageCause, DamageRecord, Envelope};
pub use graph::{Dependency, DependencyGraph, Direction};
pub use lifecycle::LifecycleCoordinator;
pub use limiter::{MultiRateLimiter, RateLimiter};
pub use registry::{DispatchReport, SystemRegistry};
pub use scheduler::{Job, JobFn, JobRef, JobResult, TaskHandle, TaskScheduler};
pub use systems::{
    DamageCtx, EntityCtx, HandlerError, HandlerResult, SystemKind, SystemSpec, TickCtx, WorldCtx,
};
pub use world::{
    CommandBuffer, ComponentKey, ComponentQuery, EntityId, EntityStore, HostWorld, NoWorlds,
    PlayerId, SystemId, WorldHandle, WorldId, WorldLookup, WorldView,
};

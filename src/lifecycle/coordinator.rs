//! # LifecycleCoordinator: wiring registry, bus, and scheduler to a host.
//!
//! The coordinator owns the cancellation scope shared by the world loop and
//! the task scheduler, and spawns the single "world loop" task on which all
//! dispatch happens.
//!
//! ## Architecture
//! ```text
//! host.start ──► LifecycleCoordinator::start(host)
//!                   ├─► subscribe Bus ─────────┐
//!                   ├─► world-job queue ───────┼──► world loop (one task)
//!                   └─► returns WorldHandle    │      │
//!                                              │      ├─ Envelope::Event  → dispatch_erased
//!   scheduler jobs ── WorldHandle::run ────────┘      ├─ Envelope::Tick   → dispatch_tick
//!                                                     ├─ Envelope::Damage → dispatch_damage
//!                                                     └─ marshaled closures (between dispatches)
//!
//! host.stop ──► shutdown()
//!                   ├─► scope.cancel()      (world loop + every scheduled job)
//!                   └─► registry.clear()    (no handler outlives the host)
//! ```
//!
//! ## Rules
//! - **One world loop**: events for a world are processed sequentially, in
//!   resolved order, on one task. No parallel fan-out across systems.
//! - **`start` is idempotent**: a one-shot latch; the second call returns the
//!   existing handle and spawns nothing.
//! - **`shutdown` is terminal**: registrations are cleared explicitly rather
//!   than cancelled implicitly, and the scope cancellation stops scheduled
//!   jobs as a unit.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::events::{Bus, Envelope};
use crate::registry::SystemRegistry;
use crate::scheduler::TaskScheduler;
use crate::world::{HostWorld, WorldHandle, WorldJob, WorldView};

/// Coordinates registry, bus, scheduler, and world loop across a host
/// plugin's lifecycle. One instance per host instance — never ambient
/// global state.
pub struct LifecycleCoordinator {
    cfg: Config,
    bus: Bus,
    registry: Arc<SystemRegistry>,
    scheduler: Arc<TaskScheduler>,
    scope: CancellationToken,
    /// One-shot start latch; holds the handle once the loop is running.
    world: Mutex<Option<WorldHandle>>,
}

impl LifecycleCoordinator {
    /// Creates a coordinator around an existing registry.
    pub fn new(cfg: Config, registry: Arc<SystemRegistry>) -> Self {
        let scope = CancellationToken::new();
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let scheduler = Arc::new(TaskScheduler::with_scope(scope.child_token()));
        Self {
            cfg,
            bus,
            registry,
            scheduler,
            scope,
            world: Mutex::new(None),
        }
    }

    /// The event bus the host publishes into.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// The system registry.
    pub fn registry(&self) -> &Arc<SystemRegistry> {
        &self.registry
    }

    /// The task scheduler sharing this coordinator's scope.
    pub fn scheduler(&self) -> &Arc<TaskScheduler> {
        &self.scheduler
    }

    /// The world handle, once [`start`](Self::start) has run.
    pub fn world(&self) -> Option<WorldHandle> {
        lock(&self.world).clone()
    }

    /// Starts the world loop and wires the bus subscription into the
    /// registry. Idempotent: a second call is a no-op returning the existing
    /// handle.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(&self, host: Arc<dyn HostWorld>) -> WorldHandle {
        let mut slot = lock(&self.world);
        if let Some(handle) = slot.as_ref() {
            return handle.clone();
        }

        let (tx, rx) = mpsc::channel::<WorldJob>(self.cfg.world_queue_clamped());
        let handle = WorldHandle::new(tx);
        *slot = Some(handle.clone());

        let events = self.bus.subscribe();
        let registry = Arc::clone(&self.registry);
        let scope = self.scope.clone();
        tokio::spawn(world_loop(events, rx, host, registry, scope));

        handle
    }

    /// Stops everything: cancels the scope (world loop and every scheduled
    /// job, as a unit) and clears all registrations so no handler references
    /// a torn-down host. Idempotent.
    pub fn shutdown(&self) {
        self.scope.cancel();
        self.scheduler.shutdown();
        self.registry.clear();
    }
}

/// The single task on which all dispatch and marshaled work runs.
async fn world_loop(
    mut events: broadcast::Receiver<Envelope>,
    mut jobs: mpsc::Receiver<WorldJob>,
    host: Arc<dyn HostWorld>,
    registry: Arc<SystemRegistry>,
    scope: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = scope.cancelled() => break,
            job = jobs.recv() => match job {
                Some(job) => {
                    let view = view_of(host.as_ref());
                    job(&view);
                }
                None => break,
            },
            envelope = events.recv() => match envelope {
                Ok(envelope) => deliver(&registry, host.as_ref(), envelope),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "world loop lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    debug!("world loop stopped");
}

fn deliver(registry: &SystemRegistry, host: &dyn HostWorld, envelope: Envelope) {
    let view = view_of(host);
    let result = match &envelope {
        Envelope::Event {
            type_id, payload, ..
        } => registry.dispatch_erased(*type_id, &**payload, &view),
        Envelope::Tick(tick) => registry.dispatch_tick(*tick, &view),
        Envelope::Damage(record) => registry.dispatch_damage(record, &view),
    };
    if let Err(e) = result {
        // Configuration bug (unresolved dependency): loud, but the loop
        // keeps serving other envelopes.
        error!(error = %e, label = e.as_label(), envelope = ?envelope, "dispatch aborted");
    }
}

fn view_of(host: &dyn HostWorld) -> WorldView<'_> {
    WorldView {
        store: host.store(),
        commands: host.commands(),
        worlds: host.worlds(),
    }
}

fn lock(slot: &Mutex<Option<WorldHandle>>) -> std::sync::MutexGuard<'_, Option<WorldHandle>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

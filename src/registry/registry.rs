//! # System registry — dependency-ordered, failure-isolated dispatch.
//!
//! [`SystemRegistry`] owns every registered system, partitioned by
//! [`SystemKind`], together with one dependency graph per kind and a cache of
//! resolved execution orders.
//!
//! ## Architecture
//! ```text
//! register(spec) ──► shelf[kind] ──► graph.insert + edges ──► cycle check
//!                                            │ (rollback on cycle)
//!                                            ▼
//!                                   invalidate cached orders
//!
//! dispatch_*(…) ──► ordered(kind, event type)     (cached after first build)
//!                      │
//!                      ▼  for each system in order
//!                   filter gate ──► query entities ──► invoke handler
//!                                                        │
//!                                   Err / panic ──► log, count, continue
//! ```
//!
//! ## Rules
//! - **Readers-writer discipline**: dispatch holds the read lock for its full
//!   duration; registration takes the write lock, so it blocks until no
//!   dispatch is using the stale order, then invalidates the cache.
//! - **Per-handler isolation**: a handler that returns `Err` or panics is
//!   logged with its system id and never stops dispatch to later systems.
//!   Systems are contributed independently; one bug must not disable
//!   unrelated gameplay logic.
//! - **Registered means active**: there is no pause state. Unregister and
//!   re-register to suspend a system.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::error;

use crate::error::ConfigError;
use crate::events::DamageRecord;
use crate::graph::DependencyGraph;
use crate::systems::{DamageCtx, EntityCtx, Handler, SystemKind, SystemSpec, TickCtx, WorldCtx};
use crate::world::{SystemId, WorldView};

/// One kind partition: its systems and their dependency graph.
#[derive(Default)]
struct Shelf {
    systems: HashMap<SystemId, Arc<SystemSpec>>,
    graph: DependencyGraph,
}

#[derive(Default)]
struct Inner {
    shelves: HashMap<SystemKind, Shelf>,
}

impl Inner {
    fn shelf(&self, kind: SystemKind) -> Option<&Shelf> {
        self.shelves.get(&kind)
    }

    fn shelf_mut(&mut self, kind: SystemKind) -> &mut Shelf {
        self.shelves.entry(kind).or_default()
    }
}

/// Counters describing one dispatch call.
///
/// `invoked` includes failed invocations; `failed` counts handlers that
/// returned `Err` or panicked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Systems whose filter accepted the instance.
    pub matched: usize,
    /// Handler invocations performed (per entity for entity-scoped kinds).
    pub invoked: usize,
    /// Invocations that failed (error return or panic).
    pub failed: usize,
}

impl DispatchReport {
    fn absorb(&mut self, other: DispatchReport) {
        self.matched += other.matched;
        self.invoked += other.invoked;
        self.failed += other.failed;
    }
}

/// Registry of systems with cached dependency-ordered dispatch.
#[derive(Default)]
pub struct SystemRegistry {
    inner: RwLock<Inner>,
    /// Resolved orders keyed by `(kind, event type)`; `None` for kinds
    /// without an event type (Tick, Damage). Invalidated per kind on any
    /// registration change.
    cache: Mutex<HashMap<(SystemKind, Option<TypeId>), Arc<Vec<Arc<SystemSpec>>>>>,
}

impl SystemRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a system.
    ///
    /// Fails with [`ConfigError::DuplicateId`] if the id is taken within the
    /// kind, [`ConfigError::InvalidInterval`] for a tick system with interval
    /// 0, or [`ConfigError::DependencyCycle`] if the declared edges close a
    /// cycle — in which case the insertion is rolled back and the registry
    /// stays usable.
    ///
    /// Edges referencing not-yet-registered ids are accepted; they are
    /// honored once both ends exist and error at order-build time otherwise.
    pub fn register(&self, spec: SystemSpec) -> Result<(), ConfigError> {
        if spec.kind == SystemKind::Tick && spec.interval == 0 {
            return Err(ConfigError::InvalidInterval {
                id: spec.id.clone(),
                interval: spec.interval,
            });
        }

        let mut inner = write(&self.inner);
        let kind = spec.kind;
        let shelf = inner.shelf_mut(kind);

        if shelf.systems.contains_key(&spec.id) {
            return Err(ConfigError::DuplicateId {
                kind,
                id: spec.id.clone(),
            });
        }

        shelf.graph.insert(spec.id.clone(), spec.priority);
        for dep in &spec.dependencies {
            shelf
                .graph
                .add_edge(&spec.id, dep.target.clone(), dep.direction);
        }

        if let Some(ids) = shelf.graph.detect_cycle() {
            shelf.graph.remove(&spec.id);
            return Err(ConfigError::DependencyCycle { ids });
        }

        shelf.systems.insert(spec.id.clone(), Arc::new(spec));
        self.invalidate(kind);
        Ok(())
    }

    /// Removes a system. Idempotent; unknown ids are a no-op.
    pub fn unregister(&self, id: &SystemId, kind: SystemKind) {
        let mut inner = write(&self.inner);
        let shelf = inner.shelf_mut(kind);
        if shelf.systems.remove(id).is_some() {
            shelf.graph.remove(id);
            self.invalidate(kind);
        }
    }

    /// Removes every system of every kind. Called at host shutdown so no
    /// handler outlives a torn-down host.
    pub fn clear(&self) {
        let mut inner = write(&self.inner);
        inner.shelves.clear();
        lock(&self.cache).clear();
    }

    /// Number of systems registered under `kind`.
    pub fn count(&self, kind: SystemKind) -> usize {
        read(&self.inner)
            .shelf(kind)
            .map(|s| s.systems.len())
            .unwrap_or(0)
    }

    /// Dispatches a typed event to entity-scoped and then world-scoped
    /// systems listening for `E`.
    pub fn dispatch_event<E: Any>(
        &self,
        event: &E,
        view: &WorldView<'_>,
    ) -> Result<DispatchReport, ConfigError> {
        self.dispatch_erased(TypeId::of::<E>(), event, view)
    }

    /// Dispatches an erased event by its payload `TypeId`.
    ///
    /// Entity-scoped systems run first (ordered within their kind), then
    /// world-scoped systems. Used by the world loop; prefer
    /// [`dispatch_event`](Self::dispatch_event) from typed call sites.
    pub fn dispatch_erased(
        &self,
        type_id: TypeId,
        event: &dyn Any,
        view: &WorldView<'_>,
    ) -> Result<DispatchReport, ConfigError> {
        let inner = read(&self.inner);
        let mut report = DispatchReport::default();

        for sys in self
            .ordered(&inner, SystemKind::EntityEvent, Some(type_id))?
            .iter()
        {
            if !accepts(sys, event) {
                continue;
            }
            report.matched += 1;
            if let Handler::Entity(handler) = &sys.handler {
                for entity in view.store.select(&sys.query) {
                    let ctx = EntityCtx {
                        entity,
                        commands: view.commands,
                    };
                    report.absorb(invoke(sys, || handler(&ctx, event)));
                }
            }
        }

        for sys in self
            .ordered(&inner, SystemKind::WorldEvent, Some(type_id))?
            .iter()
        {
            if !accepts(sys, event) {
                continue;
            }
            report.matched += 1;
            if let Handler::World(handler) = &sys.handler {
                let ctx = WorldCtx {
                    commands: view.commands,
                };
                report.absorb(invoke(sys, || handler(&ctx, event)));
            }
        }

        Ok(report)
    }

    /// Dispatches a tick to tick systems whose interval divides `tick`.
    ///
    /// Each due system runs once per entity matching its query. The filter,
    /// when set, receives the tick number (`u64`).
    pub fn dispatch_tick(
        &self,
        tick: u64,
        view: &WorldView<'_>,
    ) -> Result<DispatchReport, ConfigError> {
        let inner = read(&self.inner);
        let mut report = DispatchReport::default();

        for sys in self.ordered(&inner, SystemKind::Tick, None)?.iter() {
            if tick % sys.interval != 0 {
                continue;
            }
            if !accepts(sys, &tick) {
                continue;
            }
            report.matched += 1;
            if let Handler::Tick(handler) = &sys.handler {
                for entity in view.store.select(&sys.query) {
                    let ctx = TickCtx {
                        entity,
                        tick,
                        commands: view.commands,
                    };
                    report.absorb(invoke(sys, || handler(&ctx)));
                }
            }
        }

        Ok(report)
    }

    /// Dispatches a damage record to damage systems.
    ///
    /// A cancelled record does not stop the order: later systems still run
    /// and observe the cancelled state. The filter, when set, receives the
    /// [`DamageRecord`].
    pub fn dispatch_damage(
        &self,
        record: &DamageRecord,
        view: &WorldView<'_>,
    ) -> Result<DispatchReport, ConfigError> {
        let inner = read(&self.inner);
        let mut report = DispatchReport::default();
        let world = record.player.and_then(|p| view.worlds.world_of(p));

        for sys in self.ordered(&inner, SystemKind::Damage, None)?.iter() {
            if !accepts(sys, record) {
                continue;
            }
            report.matched += 1;
            if let Handler::Damage(handler) = &sys.handler {
                let ctx = DamageCtx {
                    damage: record,
                    world,
                    commands: view.commands,
                };
                report.absorb(invoke(sys, || handler(&ctx)));
            }
        }

        Ok(report)
    }

    /// Resolves (and caches) the execution order for `(kind, event type)`.
    fn ordered(
        &self,
        inner: &Inner,
        kind: SystemKind,
        type_id: Option<TypeId>,
    ) -> Result<Arc<Vec<Arc<SystemSpec>>>, ConfigError> {
        let key = (kind, type_id);
        let mut cache = lock(&self.cache);
        if let Some(list) = cache.get(&key) {
            return Ok(Arc::clone(list));
        }

        let list = match inner.shelf(kind) {
            Some(shelf) => {
                let order = shelf.graph.build_order()?;
                Arc::new(
                    order
                        .iter()
                        .filter_map(|id| shelf.systems.get(id))
                        .filter(|sys| type_id.is_none() || sys.event_type == type_id)
                        .cloned()
                        .collect::<Vec<_>>(),
                )
            }
            None => Arc::new(Vec::new()),
        };
        cache.insert(key, Arc::clone(&list));
        Ok(list)
    }

    /// Drops cached orders for one kind. Caller holds the write lock on
    /// `inner`, so no dispatch is mid-flight on the stale order.
    fn invalidate(&self, kind: SystemKind) {
        lock(&self.cache).retain(|(k, _), _| *k != kind);
    }
}

/// Filter gate; no filter means accept-all.
fn accepts(sys: &SystemSpec, instance: &dyn Any) -> bool {
    match &sys.filter {
        Some(filter) => filter(instance),
        None => true,
    }
}

/// Runs one handler invocation with full isolation: both `Err` returns and
/// panics are caught, logged with the system id, and absorbed.
fn invoke(
    sys: &SystemSpec,
    call: impl FnOnce() -> crate::systems::HandlerResult,
) -> DispatchReport {
    let mut report = DispatchReport {
        invoked: 1,
        ..Default::default()
    };
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            report.failed = 1;
            error!(
                system = %sys.id,
                kind = %sys.kind,
                error = %e,
                "system handler failed"
            );
        }
        Err(payload) => {
            report.failed = 1;
            error!(
                system = %sys.id,
                kind = %sys.kind,
                panic = %panic_message(&payload),
                "system handler panicked"
            );
        }
    }
    report
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn read(lock: &RwLock<Inner>) -> std::sync::RwLockReadGuard<'_, Inner> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(lock: &RwLock<Inner>) -> std::sync::RwLockWriteGuard<'_, Inner> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<'a, K, V>(m: &'a Mutex<HashMap<K, V>>) -> std::sync::MutexGuard<'a, HashMap<K, V>> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

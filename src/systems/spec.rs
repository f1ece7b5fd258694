//! # System specification for registered dispatch.
//!
//! Defines [`SystemSpec`] — a configuration bundle describing one system:
//! its id, kind, listened event type, priority, dependency edges, entity
//! query, event filter, and the handler closure itself.
//!
//! A spec is created with one of the kind-typed constructors
//! ([`SystemSpec::on_entity_event`], [`SystemSpec::on_world_event`],
//! [`SystemSpec::on_tick`], [`SystemSpec::on_damage`]) and refined with
//! builder methods, then passed to
//! [`SystemRegistry::register`](crate::SystemRegistry::register).
//!
//! ## Rules
//! - Handlers are plain closures returning [`HandlerResult`]; callers never
//!   implement a shared base trait. Typed closures are erased at
//!   construction; the event's `TypeId` is the only identity kept.
//! - `priority` defaults to 0; lower runs earlier.
//! - `query` defaults to match-all; `filter` defaults to accept-all.
//!
//! ## Example
//! ```
//! use systemvisor::{ComponentQuery, SystemSpec};
//!
//! struct TimeChange { dawn: bool }
//!
//! let spec = SystemSpec::on_entity_event::<TimeChange, _>("dawn-greeter", |ctx, _ev| {
//!     // queue a greeting for ctx.entity
//!     Ok(())
//! })
//! .query(ComponentQuery::with(["greeting"]))
//! .filter(|ev: &TimeChange| ev.dawn)
//! .priority(10)
//! .after("time-tracker");
//! assert_eq!(spec.id().as_str(), "dawn-greeter");
//! ```

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::events::DamageRecord;
use crate::graph::Dependency;
use crate::systems::context::{DamageCtx, EntityCtx, TickCtx, WorldCtx};
use crate::systems::kind::SystemKind;
use crate::world::{ComponentQuery, SystemId};

/// Error type handlers may raise; caught and logged at the dispatch boundary.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type of system handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// Erased handler, tagged by dispatch shape.
#[derive(Clone)]
pub(crate) enum Handler {
    Entity(Arc<dyn Fn(&EntityCtx<'_>, &dyn Any) -> HandlerResult + Send + Sync>),
    World(Arc<dyn Fn(&WorldCtx<'_>, &dyn Any) -> HandlerResult + Send + Sync>),
    Tick(Arc<dyn Fn(&TickCtx<'_>) -> HandlerResult + Send + Sync>),
    Damage(Arc<dyn Fn(&DamageCtx<'_>) -> HandlerResult + Send + Sync>),
}

/// Erased filter over the event or damage instance.
type Filter = Arc<dyn Fn(&dyn Any) -> bool + Send + Sync>;

/// Specification of one system, ready for registration.
#[derive(Clone)]
pub struct SystemSpec {
    pub(crate) id: SystemId,
    pub(crate) kind: SystemKind,
    pub(crate) event_type: Option<TypeId>,
    pub(crate) event_name: Option<&'static str>,
    pub(crate) priority: i32,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) query: ComponentQuery,
    pub(crate) filter: Option<Filter>,
    pub(crate) interval: u64,
    pub(crate) handler: Handler,
}

impl SystemSpec {
    fn new(id: impl Into<SystemId>, kind: SystemKind, handler: Handler) -> Self {
        Self {
            id: id.into(),
            kind,
            event_type: None,
            event_name: None,
            priority: 0,
            dependencies: Vec::new(),
            query: ComponentQuery::all(),
            filter: None,
            interval: 0,
            handler,
        }
    }

    /// Entity-scoped system listening for events of type `E`.
    ///
    /// The handler runs once per entity matching the query, for every event
    /// passing the filter.
    pub fn on_entity_event<E, F>(id: impl Into<SystemId>, handler: F) -> Self
    where
        E: Any + Send + Sync,
        F: Fn(&EntityCtx<'_>, &E) -> HandlerResult + Send + Sync + 'static,
    {
        let erased = Arc::new(move |ctx: &EntityCtx<'_>, ev: &dyn Any| {
            match ev.downcast_ref::<E>() {
                Some(ev) => handler(ctx, ev),
                None => Ok(()),
            }
        });
        let mut spec = Self::new(id, SystemKind::EntityEvent, Handler::Entity(erased));
        spec.event_type = Some(TypeId::of::<E>());
        spec.event_name = Some(std::any::type_name::<E>());
        spec
    }

    /// World-scoped system listening for events of type `E`.
    pub fn on_world_event<E, F>(id: impl Into<SystemId>, handler: F) -> Self
    where
        E: Any + Send + Sync,
        F: Fn(&WorldCtx<'_>, &E) -> HandlerResult + Send + Sync + 'static,
    {
        let erased = Arc::new(move |ctx: &WorldCtx<'_>, ev: &dyn Any| {
            match ev.downcast_ref::<E>() {
                Some(ev) => handler(ctx, ev),
                None => Ok(()),
            }
        });
        let mut spec = Self::new(id, SystemKind::WorldEvent, Handler::World(erased));
        spec.event_type = Some(TypeId::of::<E>());
        spec.event_name = Some(std::any::type_name::<E>());
        spec
    }

    /// Tick system invoked on ticks where `tick % interval == 0`, once per
    /// entity matching the query.
    ///
    /// `interval` must be positive; registration rejects 0.
    pub fn on_tick<F>(id: impl Into<SystemId>, interval: u64, handler: F) -> Self
    where
        F: Fn(&TickCtx<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let mut spec = Self::new(id, SystemKind::Tick, Handler::Tick(Arc::new(handler)));
        spec.interval = interval;
        spec
    }

    /// Damage system invoked once per damage record.
    pub fn on_damage<F>(id: impl Into<SystemId>, handler: F) -> Self
    where
        F: Fn(&DamageCtx<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(id, SystemKind::Damage, Handler::Damage(Arc::new(handler)))
    }

    /// Sets the priority (lower runs earlier; default 0).
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Declares "run before `target`".
    pub fn before(mut self, target: impl Into<SystemId>) -> Self {
        self.dependencies.push(Dependency::before(target));
        self
    }

    /// Declares "run after `target`".
    pub fn after(mut self, target: impl Into<SystemId>) -> Self {
        self.dependencies.push(Dependency::after(target));
        self
    }

    /// Sets the entity query (EntityEvent/Tick kinds; default match-all).
    pub fn query(mut self, query: ComponentQuery) -> Self {
        self.query = query;
        self
    }

    /// Sets a typed filter over the event instance (default accept-all).
    ///
    /// For damage systems use `T = `[`DamageRecord`]; see
    /// [`filter_damage`](Self::filter_damage). A filter whose type does not
    /// match the dispatched instance rejects it.
    pub fn filter<T, F>(mut self, filter: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(move |ev: &dyn Any| {
            ev.downcast_ref::<T>().is_some_and(&filter)
        }));
        self
    }

    /// Sets a filter over the damage record (damage systems).
    pub fn filter_damage<F>(self, filter: F) -> Self
    where
        F: Fn(&DamageRecord) -> bool + Send + Sync + 'static,
    {
        self.filter::<DamageRecord, _>(filter)
    }

    /// The system id.
    pub fn id(&self) -> &SystemId {
        &self.id
    }

    /// The system kind.
    pub fn kind(&self) -> SystemKind {
        self.kind
    }

    /// The declared dependency edges.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }
}

//! # Host world interface: identities, queries, and access traits.
//!
//! The dispatch core never owns simulation state. Everything it needs from
//! the surrounding simulation is expressed here as small traits the host
//! implements:
//!
//! - [`EntityStore`] — enumerate entities matching a component-presence query
//! - [`CommandBuffer`] — opaque deferred-mutation handle, passed through to
//!   handler contexts unmodified (downcast on the host side)
//! - [`WorldLookup`] — resolve a player reference to a world id; a miss is a
//!   normal state (`None`), never an error
//!
//! ## Rules
//! - Id newtypes ([`EntityId`], [`PlayerId`], [`WorldId`], [`SystemId`]) are
//!   plain comparable identities; the core needs no reflection over them.
//! - [`ComponentQuery`] is presence-only: an empty query matches every entity.
//! - [`WorldView`] bundles borrowed trait objects for one dispatch call; it is
//!   never stored.

mod handle;

pub use handle::WorldHandle;
pub(crate) use handle::WorldJob;

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Identity of an entity in the host's store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity:{}", self.0)
    }
}

/// Identity of a player in the host simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player:{}", self.0)
    }
}

/// Identity of a world/universe in the host simulation.
///
/// The core only carries this value into handler contexts; it never
/// dereferences it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorldId(pub u64);

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world:{}", self.0)
    }
}

/// Stable, comparable identity of a registered system.
///
/// Cheap to clone (`Arc<str>` internally); unique per
/// [`SystemKind`](crate::SystemKind).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(Arc<str>);

impl SystemId {
    /// Creates a new system id.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SystemId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SystemId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a component in the host's store.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComponentKey(Cow<'static, str>);

impl ComponentKey {
    /// Creates a new component key.
    pub fn new(key: impl Into<Cow<'static, str>>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ComponentKey {
    fn from(s: &'static str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ComponentKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Component-presence query used to select which entities a system processes.
///
/// An empty query matches every entity (the registration default).
///
/// ## Example
/// ```
/// use systemvisor::ComponentQuery;
///
/// let q = ComponentQuery::with(["position", "velocity"]);
/// assert!(!q.is_match_all());
/// assert_eq!(q.required().len(), 2);
/// assert!(ComponentQuery::all().is_match_all());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ComponentQuery {
    required: Vec<ComponentKey>,
}

impl ComponentQuery {
    /// Query matching every entity.
    pub fn all() -> Self {
        Self::default()
    }

    /// Query requiring presence of every given component.
    pub fn with<I>(keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ComponentKey>,
    {
        Self {
            required: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds one more required component.
    pub fn require(mut self, key: impl Into<ComponentKey>) -> Self {
        self.required.push(key.into());
        self
    }

    /// True if the query has no requirements (matches every entity).
    pub fn is_match_all(&self) -> bool {
        self.required.is_empty()
    }

    /// The required component keys.
    pub fn required(&self) -> &[ComponentKey] {
        &self.required
    }
}

/// Entity enumeration, delegated to the host's component storage.
pub trait EntityStore: Send + Sync {
    /// Returns the entities whose component set satisfies `query`.
    ///
    /// An empty (match-all) query returns every live entity. Enumeration
    /// order is the host's; the core imposes no ordering across entities.
    fn select(&self, query: &ComponentQuery) -> Vec<EntityId>;
}

/// Deferred command-buffer handle supplied by the host.
///
/// The core treats it as opaque and passes it through to handler contexts
/// unmodified; handlers downcast to the host's concrete buffer type via
/// [`CommandBuffer::as_any`] to queue mutations.
pub trait CommandBuffer: Send + Sync {
    /// Upcast for host-side downcasting in handlers.
    fn as_any(&self) -> &dyn Any;
}

/// World/universe lookup by player reference.
pub trait WorldLookup: Send + Sync {
    /// Resolves the world a player is currently in.
    ///
    /// `None` means "not currently resolvable" (player disconnected
    /// mid-dispatch, for example) and must be handled as a normal state.
    fn world_of(&self, player: PlayerId) -> Option<WorldId>;
}

/// Lookup that resolves nothing. Used when the host provides no world lookup.
pub struct NoWorlds;

impl WorldLookup for NoWorlds {
    fn world_of(&self, _player: PlayerId) -> Option<WorldId> {
        None
    }
}

pub(crate) static NO_WORLDS: NoWorlds = NoWorlds;

/// Borrowed bundle of host accessors for one dispatch call.
#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    /// Entity enumeration.
    pub store: &'a dyn EntityStore,
    /// Deferred command buffer handed to handler contexts.
    pub commands: &'a dyn CommandBuffer,
    /// Player-to-world resolution (used by damage contexts).
    pub worlds: &'a dyn WorldLookup,
}

impl<'a> WorldView<'a> {
    /// Creates a view without world lookup (damage contexts resolve to `None`).
    pub fn new(store: &'a dyn EntityStore, commands: &'a dyn CommandBuffer) -> Self {
        Self {
            store,
            commands,
            worlds: &NO_WORLDS,
        }
    }

    /// Replaces the world lookup.
    pub fn with_worlds(mut self, worlds: &'a dyn WorldLookup) -> Self {
        self.worlds = worlds;
        self
    }
}

/// Everything the world loop needs from the host, behind one object.
///
/// Implemented by the host and handed to
/// [`LifecycleCoordinator::start`](crate::LifecycleCoordinator::start); the
/// world loop builds a fresh [`WorldView`] from it for every dispatch.
pub trait HostWorld: Send + Sync + 'static {
    /// Entity enumeration.
    fn store(&self) -> &dyn EntityStore;

    /// Deferred command buffer.
    fn commands(&self) -> &dyn CommandBuffer;

    /// Player-to-world resolution. Defaults to resolving nothing.
    fn worlds(&self) -> &dyn WorldLookup {
        &NO_WORLDS
    }
}

//! # Envelopes carried on the event bus.
//!
//! An [`Envelope`] is what the host publishes: a typed game event, a tick
//! number, or a damage record. Typed payloads are erased to
//! `Arc<dyn Any + Send + Sync>` plus their `TypeId`; systems registered for
//! that type downcast on the way back in. The core needs only a comparable
//! identity per event type, never reflection.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::world::{EntityId, PlayerId};

/// Classification of a damage instance (fall, fire, attack, ...).
///
/// An open string key rather than an enum: causes are contributed by the host
/// and by plugins, and the core only ever compares them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DamageCause(Cow<'static, str>);

impl DamageCause {
    /// Creates a new cause key.
    pub fn new(cause: impl Into<Cow<'static, str>>) -> Self {
        Self(cause.into())
    }

    /// Returns the cause as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for DamageCause {
    fn from(s: &'static str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for DamageCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One damage instance flowing through damage-kind systems.
///
/// The cancel flag is shared: once any system in the order cancels, later
/// systems still run (logging, compensation) but observe the cancelled state.
///
/// ## Example
/// ```
/// use systemvisor::{DamageRecord, EntityId};
///
/// let rec = DamageRecord::new("fall", 7.5, EntityId(3));
/// assert!(!rec.is_cancelled());
/// rec.cancel();
/// assert!(rec.is_cancelled());
/// ```
#[derive(Debug)]
pub struct DamageRecord {
    /// What caused the damage.
    pub cause: DamageCause,
    /// Damage amount, in host units.
    pub amount: f64,
    /// The entity taking the damage.
    pub victim: EntityId,
    /// The player responsible, when one exists.
    pub player: Option<PlayerId>,
    cancelled: AtomicBool,
}

impl DamageRecord {
    /// Creates a new, uncancelled damage record.
    pub fn new(cause: impl Into<DamageCause>, amount: f64, victim: EntityId) -> Self {
        Self {
            cause: cause.into(),
            amount,
            victim,
            player: None,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Attaches the responsible player.
    pub fn with_player(mut self, player: PlayerId) -> Self {
        self.player = Some(player);
        self
    }

    /// Sets the shared cancel flag.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once any system has cancelled this damage.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A bus message: typed event, tick, or damage.
#[derive(Clone)]
pub enum Envelope {
    /// A typed game event, erased for transport.
    Event {
        /// `TypeId` of the concrete payload type.
        type_id: TypeId,
        /// Payload type name, for logs only.
        type_name: &'static str,
        /// The erased payload.
        payload: Arc<dyn Any + Send + Sync>,
    },
    /// A simulation tick.
    Tick(u64),
    /// A damage instance.
    Damage(Arc<DamageRecord>),
}

impl Envelope {
    /// Wraps a typed event.
    pub fn event<E: Any + Send + Sync>(event: E) -> Self {
        Envelope::Event {
            type_id: TypeId::of::<E>(),
            type_name: std::any::type_name::<E>(),
            payload: Arc::new(event),
        }
    }

    /// Wraps a tick number.
    pub fn tick(tick: u64) -> Self {
        Envelope::Tick(tick)
    }

    /// Wraps a damage record.
    pub fn damage(record: DamageRecord) -> Self {
        Envelope::Damage(Arc::new(record))
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Envelope::Event { type_name, .. } => {
                f.debug_struct("Event").field("type", type_name).finish()
            }
            Envelope::Tick(n) => f.debug_tuple("Tick").field(n).finish(),
            Envelope::Damage(rec) => f.debug_tuple("Damage").field(&rec.cause).finish(),
        }
    }
}

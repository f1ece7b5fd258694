//! Contexts handed to system handlers at invocation.
//!
//! Each dispatch shape has its own context flavor. All of them carry the
//! host's deferred [`CommandBuffer`] handle; mutations go through it, never
//! through direct state access, so ordering guarantees hold.

use std::any::Any;

use crate::events::DamageRecord;
use crate::world::{CommandBuffer, EntityId, WorldId};

/// Context for entity-scoped event handlers: one per matching entity.
pub struct EntityCtx<'a> {
    /// The entity this invocation is about.
    pub entity: EntityId,
    /// Deferred command buffer for queuing mutations.
    pub commands: &'a dyn CommandBuffer,
}

/// Context for world-scoped event handlers: one per event.
pub struct WorldCtx<'a> {
    /// Deferred command buffer for queuing mutations.
    pub commands: &'a dyn CommandBuffer,
}

/// Context for tick handlers: one per matching entity per due tick.
pub struct TickCtx<'a> {
    /// The entity this invocation is about.
    pub entity: EntityId,
    /// The current tick number.
    pub tick: u64,
    /// Deferred command buffer for queuing mutations.
    pub commands: &'a dyn CommandBuffer,
}

/// Context for damage handlers: one per damage record.
pub struct DamageCtx<'a> {
    /// The damage record, including its shared cancel flag.
    pub damage: &'a DamageRecord,
    /// World of the responsible player, when resolvable.
    pub world: Option<WorldId>,
    /// Deferred command buffer for queuing mutations.
    pub commands: &'a dyn CommandBuffer,
}

impl DamageCtx<'_> {
    /// Cancels the damage.
    ///
    /// Later systems in the order still run and observe the cancelled state,
    /// so logging and compensation systems keep working.
    pub fn cancel_damage(&self) {
        self.damage.cancel();
    }

    /// True once this damage has been cancelled by any system.
    pub fn is_cancelled(&self) -> bool {
        self.damage.is_cancelled()
    }
}

/// Downcasts a command buffer to the host's concrete type.
pub(crate) fn buffer_as<T: Any>(commands: &dyn CommandBuffer) -> Option<&T> {
    commands.as_any().downcast_ref::<T>()
}

macro_rules! impl_commands_as {
    ($($ctx:ident),+) => {
        $(impl $ctx<'_> {
            /// Downcasts the command buffer to the host's concrete type.
            pub fn commands_as<T: Any>(&self) -> Option<&T> {
                buffer_as::<T>(self.commands)
            }
        })+
    };
}

impl_commands_as!(EntityCtx, WorldCtx, TickCtx, DamageCtx);

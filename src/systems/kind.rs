//! Partitioning of systems by dispatch shape.

use std::fmt;

/// The four dispatch shapes a system can register under.
///
/// Kind is a property of the *system*, not the event: one published event may
/// fan out to entity-scoped and world-scoped systems, each kind ordered
/// independently. Ids are unique per kind, not globally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SystemKind {
    /// Invoked once per entity matching the system's query.
    EntityEvent,
    /// Invoked once per event, world-scoped.
    WorldEvent,
    /// Invoked on ticks where `tick % interval == 0`, once per matching entity.
    Tick,
    /// Invoked once per damage record, with cancel capability.
    Damage,
}

impl SystemKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SystemKind::EntityEvent => "entity_event",
            SystemKind::WorldEvent => "world_event",
            SystemKind::Tick => "tick",
            SystemKind::Damage => "damage",
        }
    }
}

impl fmt::Display for SystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

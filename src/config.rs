//! # Runtime configuration for the lifecycle coordinator.
//!
//! ## Sentinel values
//! - capacities are clamped to a minimum of 1 by the accessors; a zero in
//!   config never constructs an invalid channel.

/// Configuration for the coordinator's bus and world loop.
///
/// All fields are public for flexibility; prefer the clamped accessors over
/// reading fields directly.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast ring buffer.
    ///
    /// If the world loop lags behind by more than this many envelopes it
    /// observes `Lagged`, skips the oldest items, and logs the gap.
    pub bus_capacity: usize,

    /// Capacity of the world-job queue fed by [`WorldHandle`](crate::WorldHandle).
    ///
    /// Senders back-pressure (await) when the queue is full.
    pub world_queue_capacity: usize,
}

impl Config {
    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// World-job queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn world_queue_clamped(&self) -> usize {
        self.world_queue_capacity.max(1)
    }
}

impl Default for Config {
    /// Defaults: `bus_capacity = 1024`, `world_queue_capacity = 256`.
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            world_queue_capacity: 256,
        }
    }
}

//! # Event bus for delivering envelopes to the world loop.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking publishing from multiple host threads (gameplay hooks, tick
//! sources, damage callbacks).
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls
//!   `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent envelopes.
//! - **Lag handling**: a slow consumer gets `RecvError::Lagged(n)` and skips
//!   the `n` oldest items; the world loop logs this and keeps going.
//! - **No persistence**: envelopes published before `start()` wires the world
//!   loop are lost.

use tokio::sync::broadcast;

use super::envelope::{DamageRecord, Envelope};

/// Broadcast channel for dispatch envelopes.
///
/// Cheap to clone (internally holds an `Arc`-backed sender); the host keeps a
/// clone wherever it produces events.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Envelope>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Envelope>(capacity);
        Self { tx }
    }

    /// Publishes an envelope to all active receivers.
    ///
    /// If there are no receivers the envelope is dropped; this function still
    /// returns immediately.
    pub fn publish(&self, envelope: Envelope) {
        let _ = self.tx.send(envelope);
    }

    /// Publishes a typed game event.
    pub fn publish_event<E: std::any::Any + Send + Sync>(&self, event: E) {
        self.publish(Envelope::event(event));
    }

    /// Publishes a tick number.
    pub fn publish_tick(&self, tick: u64) {
        self.publish(Envelope::tick(tick));
    }

    /// Publishes a damage record.
    pub fn publish_damage(&self, record: DamageRecord) {
        self.publish(Envelope::damage(record));
    }

    /// Creates a receiver observing subsequent envelopes.
    ///
    /// Each call creates an independent receiver that only sees envelopes
    /// sent after it subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }
}

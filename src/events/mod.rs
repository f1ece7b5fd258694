//! # Event delivery into the dispatch core.
//!
//! The host publishes [`Envelope`] values into a [`Bus`]; the lifecycle
//! coordinator's world loop is the single consumer that fans them into the
//! [`SystemRegistry`](crate::SystemRegistry).
//!
//! ## Architecture
//! ```text
//! Publishers (host, many):            Consumer (one):
//!   game events  ──┐
//!   tick source  ──┼──────► Bus ───────► world loop ────► registry.dispatch_*
//!   damage hooks ──┘  (broadcast chan)
//! ```
//!
//! Typed events travel as [`Envelope::Event`] with the payload's `TypeId`;
//! ticks and damage have dedicated variants since their dispatch shape
//! differs (interval gate, shared cancel flag).

mod bus;
mod envelope;

pub use bus::Bus;
pub use envelope::{DamageCause, DamageRecord, Envelope};

//! # Host lifecycle wiring.
//!
//! [`LifecycleCoordinator`] ties the registry, bus, scheduler, and world loop
//! to a host plugin's start/stop signals.

mod coordinator;

pub use coordinator::LifecycleCoordinator;

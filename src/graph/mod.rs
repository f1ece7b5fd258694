//! # Dependency-ordered execution.
//!
//! [`DependencyGraph`] turns declared before/after constraints plus numeric
//! priorities into one deterministic execution order per system kind. The
//! registry owns one graph per kind and rebuilds (and caches) orders lazily.

mod dependency;

pub use dependency::{Dependency, DependencyGraph, Direction};

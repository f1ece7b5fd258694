//! # System registry and dependency-ordered dispatch engine.

mod registry;

pub use registry::{DispatchReport, SystemRegistry};

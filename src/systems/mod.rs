//! # Registered units of gameplay logic.
//!
//! A *system* is one independently-authored handler plus its dispatch
//! metadata: kind, listened event type, priority, before/after dependencies,
//! entity query, and event filter. Systems are built with the
//! [`SystemSpec`] builder and handed to the
//! [`SystemRegistry`](crate::SystemRegistry).

mod context;
mod kind;
mod spec;

pub use context::{DamageCtx, EntityCtx, TickCtx, WorldCtx};
pub use kind::SystemKind;
pub use spec::{HandlerError, HandlerResult, SystemSpec};

pub(crate) use spec::Handler;

//! Typed, multi-channel event bus used to wire colod's sub-components (orchestrator,
//! link monitor, watchdog, management socket) together without giving them direct
//! handles to one another.
mod event_bus;

pub use crate::event_bus::{BusEvent, EventBus};
use std::any::TypeId;

mod receiver;

pub use crate::receiver::Receiver;

pub use event_bus_macros::Event;

/// Returns the [`TypeId`] the bus keys its channels by for event type `T`.
pub(crate) fn tid<T: 'static>() -> TypeId {
    TypeId::of::<T>()
}

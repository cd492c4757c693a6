//! Runtime events: types and broadcast bus.
//!
//! The environment, interceptor chains and engine state forwarders publish
//! [`Event`]s to a shared [`Bus`]; the
//! [`SubscriberSet`](crate::subscribers::SubscriberSet) fans them out to
//! user-registered subscribers.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

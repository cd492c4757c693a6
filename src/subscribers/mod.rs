//! # Event subscribers.
//!
//! Subscribers observe lifecycle events without participating in lifecycle
//! control flow (unlike interceptors, they cannot halt a transition).
//!
//! ```text
//! environment ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit(&Event)
//!                                                          ├─► [queue S1] ─► worker ─► on_event()
//!                                                          └─► [queue SN] ─► worker ─► on_event()
//! ```
//!
//! - [`Subscribe`] — the extension point, one bounded queue + worker per subscriber.
//! - [`SubscriberSet`] — non-blocking fan-out with panic isolation.
//! - `LogWriter` — stdout demo subscriber (behind the `logging` feature).

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

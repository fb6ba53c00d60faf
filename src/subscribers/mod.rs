//! # Event subscribers.
//!
//! [`Subscribe`] is the extension point for reacting to runtime events; the
//! [`SubscriberSet`] fans events out to every subscriber without blocking the
//! publisher.
//!
//! ```text
//! ProcessSupervisor ── publish(Event) ──► Bus ──► RunController listener ──► SubscriberSet
//!                                                                  ┌─────────┼─────────┐
//!                                                                  ▼         ▼         ▼
//!                                                              LogWriter   Custom     ...
//! ```
//!
//! [`LogWriter`] is the built-in subscriber that renders worker lifecycle events
//! through `tracing` (restarts, terminations, kill escalations).

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;

//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish runtime events emitted by the controller, the registry and the
//! process supervisors.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `RunController`, `WorkerRegistry`, `ProcessSupervisor`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `RunController::subscriber_listener()` (fans out to
//!   `SubscriberSet`).
//!
//! Events are observability only: no control decision depends on them.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

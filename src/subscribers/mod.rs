//! # Runtime-event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out, and the
//! optional built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   WidgetActor ── publish(Event) ──► Bus ──► event listener ──► SubscriberSet
//!                                                                   │
//!                                                     ┌─────────────┼─────────────┐
//!                                                     ▼             ▼             ▼
//!                                                 LogWriter      Metrics       Custom
//! ```
//!
//! Observers of a widget are not subscribers: they receive
//! [`Notification`](crate::Notification)s on their own queues. Subscribers see what the
//! runtime did (created, rejected, dropped, ...).

#[cfg(feature = "logging")]
mod log;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;

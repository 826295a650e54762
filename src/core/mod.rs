//! Runtime core: widget actors and their manager.
//!
//! The public API from this module is [`WidgetManager`] (plus its builder and
//! [`Config`]), which creates widgets, routes their commands and tears them down.
//!
//! Internal modules:
//! - [`actor`]: serialized owner of one widget (state, observers, outbox);
//! - [`manager`]: widget table, routing, lifecycle and termination handling;
//! - [`builder`]: model catalogue, subscribers and event listener wiring;
//! - [`config`]: capacities and retention policy.

mod actor;
mod builder;
mod config;
mod manager;

pub use builder::WidgetManagerBuilder;
pub use config::{Config, Retention};
pub use manager::WidgetManager;

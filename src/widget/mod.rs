//! Widget building blocks: identities, commands, state, observers and delivery.
//!
//! Everything here is single-owner data driven by a widget actor
//! (see `core/actor.rs`); none of it spawns tasks or takes locks.
//!
//! ## Contents
//! - [`WidgetId`], [`ObserverId`]: identities
//! - [`Command`]: what an actor accepts
//! - [`Model`], [`TypedModel`], [`Typed`]: transition functions
//! - [`StateCell`]: authoritative value plus version and broadcast sequence
//! - [`ObserverHandle`], [`ObserverStream`]: an observer's bounded queue
//! - [`ObserverRegistry`]: observers joined to one widget
//! - [`Outbox`]: non-blocking delivery to observers
//! - [`Notification`], [`Snapshot`]: what observers receive

mod command;
mod id;
mod model;
mod notification;
mod observer;
mod outbox;
mod registry;
mod state;

pub use command::Command;
pub(crate) use command::{Envelope, Reply};
pub use id::{ObserverId, ParseIdError, WidgetId};
pub use model::{Change, Input, Model, Output, Target, Transition, Typed, TypedModel};
pub use notification::{Notification, NotificationKind, Snapshot};
pub use observer::{ObserverHandle, ObserverStream};
pub use outbox::{Dispatch, Outbox};
pub use registry::ObserverRegistry;
pub use state::StateCell;

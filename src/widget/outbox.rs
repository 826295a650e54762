//! # Broadcast outbox: non-blocking fan-out to observers.
//!
//! Hands a [`Notification`] to one observer or to every member of an
//! [`ObserverRegistry`], without ever waiting on an observer.
//!
//! ## Architecture
//! ```text
//! broadcast(registry, notification)
//!     │                          (Arc-clone per observer)
//!     ├──► try_send ──► [queue O1] ──► transport
//!     ├──► try_send ──► [queue O2] ──► transport      full ──► DeliveryDropped{reason=full}
//!     └──► try_send ──► [queue ON] ──► transport      gone ──► DeliveryDropped{reason=gone}
//! ```
//!
//! ## Rules
//! - **Non-blocking**: every delivery uses `try_send`; the actor never awaits an observer.
//! - **Isolation**: a full or dropped queue loses that one delivery only.
//! - **Per-observer FIFO**: each observer sees notifications in the order they were produced.
//! - **Silent to the sender**: drops are reported as runtime events, never as command errors.

use std::sync::Arc;

use crate::error::DeliveryError;
use crate::events::{Bus, Event, EventKind};
use crate::widget::{Notification, ObserverHandle, ObserverId, ObserverRegistry, WidgetId};

/// Outcome of one broadcast.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// Observers the notification was offered to.
    pub offered: usize,
    /// Observers whose queue accepted it.
    pub delivered: usize,
    /// Observers whose stream is gone.
    pub gone: Vec<ObserverId>,
}

/// Delivery side of one widget actor.
pub struct Outbox {
    widget: WidgetId,
    bus: Bus,
}

impl Outbox {
    /// Creates an outbox reporting drops for `widget` on `bus`.
    pub fn new(widget: WidgetId, bus: Bus) -> Self {
        Self { widget, bus }
    }

    /// Delivers one notification to one observer.
    ///
    /// On failure a [`EventKind::DeliveryDropped`] event is published and the error is
    /// returned so the caller may prune the observer.
    pub fn deliver(
        &self,
        to: &ObserverHandle,
        notification: Arc<Notification>,
    ) -> Result<(), DeliveryError> {
        let seq = notification.seq;
        to.try_deliver(notification).inspect_err(|err| {
            self.bus.publish(
                Event::new(EventKind::DeliveryDropped)
                    .with_widget(self.widget)
                    .with_observer(to.id())
                    .with_version(seq)
                    .with_reason(err.as_label()),
            );
        })
    }

    /// Offers one notification to every current member of `registry`.
    pub fn broadcast(&self, registry: &ObserverRegistry, notification: Notification) -> Dispatch {
        let notification = Arc::new(notification);
        let mut dispatch = Dispatch::default();

        for handle in registry.snapshot() {
            dispatch.offered += 1;
            match self.deliver(handle, Arc::clone(&notification)) {
                Ok(()) => dispatch.delivered += 1,
                Err(DeliveryError::Gone) => dispatch.gone.push(handle.id()),
                Err(_) => {}
            }
        }
        dispatch
    }
}

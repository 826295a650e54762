//! # Runtime events emitted by the widget manager and widget actors.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Widget lifecycle**: created, closed, retired, actor terminated
//! - **Observer lifecycle**: joined, left, pruned
//! - **Command outcome**: update applied, command rejected
//! - **Delivery**: notification dropped, subscriber overflow/panic
//!
//! Events describe what the runtime did; they are not the notifications observers receive
//! (see [`Notification`](crate::Notification)).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use widgetsync::{Event, EventKind, WidgetId};
//!
//! let ev = Event::new(EventKind::CommandRejected)
//!     .with_widget(WidgetId::from_raw(4))
//!     .with_command("update")
//!     .with_reason("malformed update payload");
//!
//! assert_eq!(ev.kind, EventKind::CommandRejected);
//! assert_eq!(ev.widget, Some(WidgetId::from_raw(4)));
//! assert_eq!(ev.reason.as_deref(), Some("malformed update payload"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::widget::{ObserverId, WidgetId};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Widget lifecycle ===
    /// Widget created and its actor spawned.
    ///
    /// Sets:
    /// - `widget`: widget id
    /// - `model`: model kind
    WidgetCreated,

    /// Widget closed explicitly; actor stopped and entry removed.
    ///
    /// Sets:
    /// - `widget`: widget id
    /// - `version`: final version
    WidgetClosed,

    /// Widget retired by its retention policy.
    ///
    /// Sets:
    /// - `widget`: widget id
    /// - `version`: final version
    /// - `reason`: retention rule that fired
    WidgetRetired,

    /// Actor ended abnormally (panic in the model); entry removed.
    ///
    /// Sets:
    /// - `widget`: widget id
    /// - `reason`: panic message
    ActorTerminated,

    // === Observer lifecycle ===
    /// Observer joined and was sent a snapshot.
    ///
    /// Sets:
    /// - `widget`, `observer`
    /// - `version`: version of the snapshot
    ObserverJoined,

    /// Observer left.
    ///
    /// Sets:
    /// - `widget`, `observer`
    ObserverLeft,

    /// Observer removed because its stream was dropped.
    ///
    /// Sets:
    /// - `widget`, `observer`
    ObserverPruned,

    // === Command outcome ===
    /// Update or observer event applied.
    ///
    /// Sets:
    /// - `widget`
    /// - `observer`: originator (observer events only)
    /// - `command`: command label
    /// - `version`: version after application
    /// - `recipients`: number of observers the broadcast was offered to
    UpdateApplied,

    /// Command rejected; state unchanged.
    ///
    /// Sets:
    /// - `widget`
    /// - `observer`: originator, if any
    /// - `command`: command label
    /// - `reason`: rejection message
    CommandRejected,

    // === Delivery ===
    /// A notification could not be handed to one observer.
    ///
    /// Sets:
    /// - `widget`, `observer`
    /// - `version`: broadcast `seq` of the dropped notification
    /// - `reason`: `"full"` or `"gone"`
    DeliveryDropped,

    /// A runtime-event subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: `"full"` or `"closed"`
    SubscriberOverflow,

    /// A runtime-event subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Widget concerned, if applicable.
    pub widget: Option<WidgetId>,
    /// Observer concerned, if applicable.
    pub observer: Option<ObserverId>,
    /// Model kind (creation events).
    pub model: Option<Arc<str>>,
    /// Command label (`update`, `observer_event`, ...).
    pub command: Option<&'static str>,
    /// Widget version at the time of the event.
    pub version: Option<u64>,
    /// Number of observers a broadcast was offered to.
    pub recipients: Option<u32>,
    /// Name of the runtime-event subscriber (subscriber events).
    pub subscriber: Option<&'static str>,
    /// Human-readable reason (errors, drop details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            widget: None,
            observer: None,
            model: None,
            command: None,
            version: None,
            recipients: None,
            subscriber: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_widget(mut self, widget: WidgetId) -> Self {
        self.widget = Some(widget);
        self
    }

    #[inline]
    pub fn with_observer(mut self, observer: ObserverId) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Attaches an optional observer (no-op for `None`).
    #[inline]
    pub fn with_observer_opt(mut self, observer: Option<ObserverId>) -> Self {
        if observer.is_some() {
            self.observer = observer;
        }
        self
    }

    #[inline]
    pub fn with_model(mut self, model: impl Into<Arc<str>>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[inline]
    pub fn with_command(mut self, command: &'static str) -> Self {
        self.command = Some(command);
        self
    }

    #[inline]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Attaches a recipient count (saturates at `u32::MAX`).
    #[inline]
    pub fn with_recipients(mut self, n: usize) -> Self {
        self.recipients = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow).with_reason(reason);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    /// Returns true for events that end a widget's life.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::WidgetClosed | EventKind::WidgetRetired | EventKind::ActorTerminated
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::WidgetCreated);
        let b = Event::new(EventKind::WidgetClosed);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn subscriber_helpers_fill_name_and_reason() {
        let ev = Event::subscriber_overflow("metrics", "full");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.subscriber, Some("metrics"));
        assert_eq!(ev.reason.as_deref(), Some("full"));

        let ev = Event::subscriber_panicked("audit", "boom".into());
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert!(!ev.is_terminal());
    }

    #[test]
    fn recipients_saturate() {
        let ev = Event::new(EventKind::UpdateApplied).with_recipients(usize::MAX);
        assert_eq!(ev.recipients, Some(u32::MAX));
    }
}

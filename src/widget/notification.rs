//! # Notifications sent from a widget actor to its observers.
//!
//! A [`Notification`] is what an observer's sink receives. The transport serializes it
//! (it derives [`Serialize`]) onto whatever wire it speaks.
//!
//! ```text
//! Join      ──► Snapshot { seq = s,   payload = full state }
//! broadcast ──► Event    { seq = s+1, payload = model-defined change }
//! reply     ──► Reply    { seq = s,   payload = answer for one observer }
//! reject    ──► Error    { seq = s,   payload = {"error": label, "message": ..} }
//! ```
//!
//! `seq` counts the broadcasts a widget has sent to its members. Only `Event`s advance it,
//! so every observer sees `Event` sequence numbers continuing without holes from the `seq`
//! of its snapshot. A hole means a notification was dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WidgetError;
use crate::widget::WidgetId;

/// Classification of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Full current state, addressed to one joining observer.
    Snapshot,
    /// Change broadcast to every member.
    Event,
    /// Output addressed to this observer only.
    Reply,
    /// A command originated by this observer was rejected.
    Error,
}

/// Message delivered to an observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Widget that produced the notification.
    pub widget: WidgetId,
    /// Notification classification.
    pub kind: NotificationKind,
    /// Broadcast sequence number (see the module docs).
    pub seq: u64,
    /// Snapshot state, event payload, or error description.
    pub payload: Value,
}

impl Notification {
    /// Creates a snapshot notification.
    pub fn snapshot(widget: WidgetId, seq: u64, state: Value) -> Self {
        Self {
            widget,
            kind: NotificationKind::Snapshot,
            seq,
            payload: state,
        }
    }

    /// Creates an event notification.
    pub fn event(widget: WidgetId, seq: u64, payload: Value) -> Self {
        Self {
            widget,
            kind: NotificationKind::Event,
            seq,
            payload,
        }
    }

    /// Creates a notification addressed to a single observer.
    pub fn reply(widget: WidgetId, seq: u64, payload: Value) -> Self {
        Self {
            widget,
            kind: NotificationKind::Reply,
            seq,
            payload,
        }
    }

    /// Creates an error notification describing a rejected command.
    pub fn error(widget: WidgetId, seq: u64, err: &WidgetError) -> Self {
        Self {
            widget,
            kind: NotificationKind::Error,
            seq,
            payload: serde_json::json!({
                "error": err.as_label(),
                "message": err.to_string(),
            }),
        }
    }

    #[inline]
    pub fn is_snapshot(&self) -> bool {
        matches!(self.kind, NotificationKind::Snapshot)
    }

    #[inline]
    pub fn is_event(&self) -> bool {
        matches!(self.kind, NotificationKind::Event)
    }

    #[inline]
    pub fn is_reply(&self) -> bool {
        matches!(self.kind, NotificationKind::Reply)
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self.kind, NotificationKind::Error)
    }
}

/// State of a widget as delivered to a joining observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Widget the snapshot belongs to.
    pub widget: WidgetId,
    /// Number of commands applied before the join.
    pub version: u64,
    /// Broadcast sequence number at the join; the next `Event` carries `seq + 1`.
    pub seq: u64,
    /// Full current state.
    pub state: Value,
}

impl From<&Snapshot> for Notification {
    fn from(s: &Snapshot) -> Self {
        Notification::snapshot(s.widget, s.seq, s.state.clone())
    }
}

//! Error types used by the widget runtime.
//!
//! This module defines two enums:
//!
//! - [`WidgetError`]: errors visible to the originator of a command (or raised by the
//!   runtime on its behalf).
//! - [`DeliveryError`]: best-effort notification delivery failures. These never reach the
//!   sender of the originating command; they surface only as
//!   [`EventKind::DeliveryDropped`](crate::EventKind::DeliveryDropped) runtime events.
//!
//! Both types provide `as_label` / `as_message` helpers for logging and metrics.

use thiserror::Error;

use crate::widget::{ObserverId, WidgetId};

/// # Errors produced by widget commands.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WidgetError {
    /// Payload rejected at the state-cell boundary; the widget state is unchanged.
    #[error("invalid command: {reason}")]
    InvalidCommand {
        /// Why the payload was rejected.
        reason: String,
    },

    /// The id was never issued by this manager.
    #[error("widget {widget} not found")]
    NotFound {
        /// The addressed widget.
        widget: WidgetId,
    },

    /// The widget was closed (explicitly, by retention, or after termination).
    #[error("widget {widget} is closed")]
    Closed {
        /// The addressed widget.
        widget: WidgetId,
    },

    /// The widget's actor died while the request was in flight.
    #[error("actor for widget {widget} terminated")]
    ActorTerminated {
        /// The widget whose actor terminated.
        widget: WidgetId,
    },

    /// The joining observer's queue could not take the snapshot, so it was not registered.
    #[error("observer {observer} cannot receive widget {widget}: {reason}")]
    ObserverUnreachable {
        /// The addressed widget.
        widget: WidgetId,
        /// The observer that tried to join.
        observer: ObserverId,
        /// Why the snapshot could not be queued.
        reason: DeliveryError,
    },

    /// No model is registered under the requested kind.
    #[error("unknown widget model {kind:?}")]
    UnknownModel {
        /// Requested model kind.
        kind: String,
    },
}

impl WidgetError {
    /// Builds an [`WidgetError::InvalidCommand`] from anything printable.
    pub fn invalid(reason: impl Into<String>) -> Self {
        WidgetError::InvalidCommand {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use widgetsync::{WidgetError, WidgetId};
    ///
    /// let err = WidgetError::NotFound { widget: WidgetId::from_raw(3) };
    /// assert_eq!(err.as_label(), "widget_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WidgetError::InvalidCommand { .. } => "invalid_command",
            WidgetError::NotFound { .. } => "widget_not_found",
            WidgetError::Closed { .. } => "widget_closed",
            WidgetError::ActorTerminated { .. } => "actor_terminated",
            WidgetError::ObserverUnreachable { .. } => "observer_unreachable",
            WidgetError::UnknownModel { .. } => "unknown_model",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            WidgetError::InvalidCommand { reason } => format!("rejected: {reason}"),
            WidgetError::NotFound { widget } => format!("not found: {widget}"),
            WidgetError::Closed { widget } => format!("closed: {widget}"),
            WidgetError::ActorTerminated { widget } => format!("terminated: {widget}"),
            WidgetError::ObserverUnreachable {
                observer, reason, ..
            } => {
                format!("unreachable: {observer} ({})", reason.as_label())
            }
            WidgetError::UnknownModel { kind } => format!("unknown model: {kind}"),
        }
    }

    /// Indicates whether the widget addressed by the failed call is gone for good.
    ///
    /// # Example
    /// ```
    /// use widgetsync::{WidgetError, WidgetId};
    ///
    /// let w = WidgetId::from_raw(1);
    /// assert!(WidgetError::Closed { widget: w }.is_terminal());
    /// assert!(!WidgetError::invalid("bad").is_terminal());
    /// ```
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WidgetError::Closed { .. } | WidgetError::ActorTerminated { .. }
        )
    }
}

/// # Best-effort delivery failure for one observer.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The observer's outbound buffer is full.
    #[error("observer buffer full")]
    Full,

    /// The observer's receiving side was dropped.
    #[error("observer gone")]
    Gone,
}

impl DeliveryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliveryError::Full => "full",
            DeliveryError::Gone => "gone",
        }
    }
}

//! # Observer handles and their outbound streams.
//!
//! An [`ObserverHandle`] pairs an [`ObserverId`] with the sending half of a bounded
//! queue. The transport keeps the receiving half ([`ObserverStream`]) and drains it onto
//! the wire.
//!
//! ```text
//!  WidgetActor ── try_send(Arc<Notification>) ──► [bounded queue] ──► ObserverStream ──► transport
//!                 (never awaits)                   (per observer)
//! ```
//!
//! ## Rules
//! - Equality and hashing use the id only; clones of a handle are the same observer.
//! - The same handle may join any number of widgets; all of them feed the same queue.
//! - Dropping the [`ObserverStream`] makes every later delivery fail with
//!   [`DeliveryError::Gone`].

use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::error::DeliveryError;
use crate::widget::{Notification, ObserverId};

/// Sending side of one observer's notification queue.
#[derive(Clone, Debug)]
pub struct ObserverHandle {
    id: ObserverId,
    sink: mpsc::Sender<Arc<Notification>>,
}

impl ObserverHandle {
    /// Creates a new observer with a fresh id and a queue of `capacity` notifications.
    ///
    /// Minimum capacity is 1 (clamped).
    pub fn channel(capacity: usize) -> (ObserverHandle, ObserverStream) {
        Self::with_id(ObserverId::next(), capacity)
    }

    /// Creates an observer with a caller-chosen id (e.g. a transport connection id).
    pub fn with_id(id: ObserverId, capacity: usize) -> (ObserverHandle, ObserverStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (ObserverHandle { id, sink: tx }, ObserverStream { id, rx })
    }

    /// Returns this observer's identity.
    #[inline]
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Returns true once the receiving side has been dropped.
    #[inline]
    pub fn is_gone(&self) -> bool {
        self.sink.is_closed()
    }

    /// Enqueues a notification without waiting.
    pub(crate) fn try_deliver(&self, n: Arc<Notification>) -> Result<(), DeliveryError> {
        self.sink.try_send(n).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Gone,
        })
    }
}

impl PartialEq for ObserverHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ObserverHandle {}

impl Hash for ObserverHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Receiving side of one observer's notification queue.
#[derive(Debug)]
pub struct ObserverStream {
    id: ObserverId,
    rx: mpsc::Receiver<Arc<Notification>>,
}

impl ObserverStream {
    /// Returns the id of the observer this stream belongs to.
    #[inline]
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Waits for the next notification.
    ///
    /// Returns `None` once every widget has dropped this observer's handle
    /// and the queue is drained.
    pub async fn recv(&mut self) -> Option<Arc<Notification>> {
        self.rx.recv().await
    }

    /// Returns the next queued notification, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Notification>> {
        self.rx.try_recv().ok()
    }

    /// Drains every notification currently queued.
    pub fn drain(&mut self) -> Vec<Arc<Notification>> {
        let mut out = Vec::new();
        while let Ok(n) = self.rx.try_recv() {
            out.push(n);
        }
        out
    }
}

impl Stream for ObserverStream {
    type Item = Arc<Notification>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

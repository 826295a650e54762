//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom runtime-event handlers
//! (logging, metrics, audit) into the widget manager. Each subscriber is driven by a
//! dedicated worker loop fed by a bounded queue owned by the
//! [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching, retries); they do **not** block
//!   widget actors nor other subscribers.
//! - Each subscriber **declares** its preferred queue capacity via
//!   [`Subscribe::queue_capacity`]. If a queue overflows, events for that
//!   subscriber are **dropped**.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use widgetsync::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct DroppedDeliveries(AtomicU64);
//!
//! #[async_trait::async_trait]
//! impl Subscribe for DroppedDeliveries {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::DeliveryDropped {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "dropped_deliveries" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for runtime-event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}

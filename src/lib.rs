//! # widgetsync
//!
//! **widgetsync** keeps server-owned widget state consistent across a changing set of
//! connected observers.
//!
//! Each widget is owned by one actor that applies every command (joins, updates,
//! observer events, leaves) strictly in order. That single order is what makes a late
//! join safe: the joining observer gets a snapshot of exactly the commands before it, and
//! every later change reaches it through the ordinary broadcast path, never twice and
//! never missing.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   transport (WebSocket, RPC, in-process ...)
//!        │ Init / Join / Update / ObserverEvent / Leave
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  WidgetManager                                                    │
//! │  - table: WidgetId → actor handle (RwLock)                        │
//! │  - model catalogue (kind → Model)                                 │
//! │  - Bus (runtime events) → SubscriberSet (LogWriter, metrics ...)  │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼ mpsc (bounded)   ▼                  ▼
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │ WidgetActor  │   │ WidgetActor  │   │ WidgetActor  │
//!   │  StateCell   │   │  StateCell   │   │  StateCell   │
//!   │  Registry    │   │  Registry    │   │  Registry    │
//!   │  Outbox      │   │  Outbox      │   │  Outbox      │
//!   └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!          │ try_send (never blocks the actor)   │
//!          ▼                                     ▼
//!   [observer queue] ─► ObserverStream ─► transport ─► client
//! ```
//!
//! ### Lifecycle
//! ```text
//! create_widget(kind, init) ──► StateCell::init ──► spawn WidgetActor::run()
//!
//! per command, in arrival order:
//!   ├─► Join(h)          snapshot ──► h; registry.add(h) once queued
//!   ├─► Leave(id)        registry.remove(id)
//!   ├─► Update / Event   cell.apply ──► broadcast to current registry
//!   └─► Init             rejected (already initialised)
//!
//! exit conditions:
//!   - close(id) / shutdown()          ─► WidgetClosed
//!   - Retention::IdleFor elapsed      ─► WidgetRetired
//!   - panic inside the model          ─► ActorTerminated (this widget only)
//! ```
//!
//! ## Features
//! | Area              | Description                                                | Key types / traits                         |
//! |-------------------|------------------------------------------------------------|--------------------------------------------|
//! | **Manager**       | Create, route, join, close widgets.                        | [`WidgetManager`], [`WidgetManagerBuilder`] |
//! | **Models**        | Pure transition functions with typed payload schemas.      | [`Model`], [`TypedModel`], [`Typed`]       |
//! | **Observers**     | Bounded per-observer notification queues.                  | [`ObserverHandle`], [`ObserverStream`]     |
//! | **Subscriber API**| Hook into runtime events (logging, metrics).               | [`Subscribe`], [`Event`], [`EventKind`]    |
//! | **Errors**        | Typed errors for command originators.                      | [`WidgetError`], [`DeliveryError`]         |
//! | **Configuration** | Capacities and retention policy.                           | [`Config`], [`Retention`]                  |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], which renders runtime events via `tracing`.
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use widgetsync::{Config, WidgetManager, models::Counter};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), widgetsync::WidgetError> {
//!     let manager = WidgetManager::builder(Config::default())
//!         .with_typed_model(Counter)
//!         .build();
//!     let id = manager.create_widget("counter", json!(0)).await?;
//!
//!     let (a, mut a_rx) = manager.observer();
//!     assert_eq!(manager.join(id, a.clone()).await?.state, json!(0));
//!
//!     manager.update(id, json!({"add": 1})).await?;
//!
//!     let (b, _b_rx) = manager.observer();
//!     assert_eq!(manager.join(id, b).await?.state, json!(1));
//!
//!     let seen: Vec<_> = a_rx.drain().iter().map(|n| n.payload.clone()).collect();
//!     assert_eq!(seen, vec![json!(0), json!(1)]);
//!
//!     manager.shutdown().await;
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
pub mod models;
mod subscribers;
mod widget;

// ---- Public re-exports ----

pub use core::{Config, Retention, WidgetManager, WidgetManagerBuilder};
pub use error::{DeliveryError, WidgetError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};
pub use widget::{
    Change, Command, Dispatch, Input, Model, Notification, NotificationKind, ObserverHandle,
    ObserverId, ObserverRegistry, ObserverStream, Outbox, Output, ParseIdError, Snapshot,
    StateCell, Target, Transition, Typed, TypedModel, WidgetId,
};

// Optional: expose the built-in tracing logger subscriber.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

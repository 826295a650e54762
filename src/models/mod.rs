//! Built-in widget models.
//!
//! - [`Counter`]: integer counter (`kind = "counter"`)
//! - [`Markers`]: list of map markers (`kind = "markers"`)
//!
//! Both are [`TypedModel`](crate::TypedModel)s; register them with
//! [`WidgetManagerBuilder::with_typed_model`](crate::WidgetManagerBuilder::with_typed_model).

mod counter;
mod markers;

pub use counter::{Counter, CounterEvent, CounterUpdate};
pub use markers::{Marker, Markers, MarkersEvent, MarkersUpdate, MoveTo};

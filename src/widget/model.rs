//! # Widget models: the pure transition function behind a [`StateCell`](crate::StateCell).
//!
//! A [`Model`] decides what a widget's state is and how commands change it. It has no
//! I/O and no concurrency of its own; the actor calls it from its serialized loop.
//!
//! Two layers are provided:
//! - [`Model`]: object-safe, works on [`serde_json::Value`]. The runtime stores
//!   models as `Arc<dyn Model>`.
//! - [`TypedModel`]: declares serde types for every payload. Wrap it in [`Typed`] to get a
//!   [`Model`]; payloads that do not match the declared schema are rejected with
//!   [`WidgetError::InvalidCommand`] before the model sees them.
//!
//! ## Contract
//! - `apply` is deterministic: same state and input, same [`Transition`].
//! - Returning `Err` leaves the widget state untouched.
//! - A transition may target every observer ([`Target::Broadcast`]) or one observer.
//!
//! ## Example
//! ```rust
//! use serde::Deserialize;
//! use serde_json::json;
//! use widgetsync::{Change, ObserverId, TypedModel};
//!
//! struct Toggle;
//!
//! #[derive(Deserialize)]
//! struct Flip;
//!
//! impl TypedModel for Toggle {
//!     const KIND: &'static str = "toggle";
//!     type State = bool;
//!     type Init = bool;
//!     type Update = bool;
//!     type Event = Flip;
//!
//!     fn init(&self, on: bool) -> Result<bool, String> {
//!         Ok(on)
//!     }
//!
//!     fn update(&self, _state: &bool, on: bool) -> Result<Change<bool>, String> {
//!         Ok(Change::new(on).broadcast(json!(on)))
//!     }
//!
//!     fn event(&self, state: &bool, _: ObserverId, _: Flip) -> Result<Change<bool>, String> {
//!         Ok(Change::new(!state).broadcast(json!(!state)))
//!     }
//! }
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::WidgetError;
use crate::widget::ObserverId;

/// Command payload handed to [`Model::apply`].
#[derive(Debug, Clone, Copy)]
pub enum Input<'a> {
    /// Update issued by the hosting program.
    Update(&'a Value),
    /// Event originated by a joined observer.
    ObserverEvent {
        /// Originating observer.
        observer: ObserverId,
        /// Event payload.
        payload: &'a Value,
    },
}

/// Recipient of one produced notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Every observer registered at the instant of application.
    Broadcast,
    /// One observer (ignored if it is not registered).
    Observer(ObserverId),
}

/// One notification produced by a transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    /// Who receives it.
    pub target: Target,
    /// Notification payload.
    pub payload: Value,
}

/// Result of applying one input: the next state plus what to tell observers.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Next authoritative state.
    pub state: Value,
    /// Notifications in the order they must be delivered.
    pub outputs: Vec<Output>,
}

/// Object-safe widget model over JSON values.
pub trait Model: Send + Sync + 'static {
    /// Stable kind name (catalogue key, logs).
    fn kind(&self) -> &str;

    /// Validates the `Init` payload and returns the initial state.
    fn init(&self, payload: &Value) -> Result<Value, WidgetError>;

    /// Derives the next state from the current one and an input.
    fn apply(&self, state: &Value, input: Input<'_>) -> Result<Transition, WidgetError>;
}

/// Typed state change returned by a [`TypedModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct Change<S> {
    /// Next state.
    pub state: S,
    /// Notifications in delivery order.
    pub outputs: Vec<Output>,
}

impl<S> Change<S> {
    /// A change that produces no notifications.
    pub fn new(state: S) -> Self {
        Self {
            state,
            outputs: Vec::new(),
        }
    }

    /// Appends a notification for every current observer.
    pub fn broadcast(mut self, payload: Value) -> Self {
        self.outputs.push(Output {
            target: Target::Broadcast,
            payload,
        });
        self
    }

    /// Appends a notification for a single observer.
    pub fn reply(mut self, to: ObserverId, payload: Value) -> Self {
        self.outputs.push(Output {
            target: Target::Observer(to),
            payload,
        });
        self
    }
}

/// Widget model with a declared payload schema.
pub trait TypedModel: Send + Sync + 'static {
    /// Kind name used in the model catalogue.
    const KIND: &'static str;

    /// Authoritative state.
    type State: Serialize + DeserializeOwned;
    /// `Init` payload.
    type Init: DeserializeOwned;
    /// `Update` payload.
    type Update: DeserializeOwned;
    /// `ObserverEvent` payload.
    type Event: DeserializeOwned;

    /// Builds the initial state.
    fn init(&self, init: Self::Init) -> Result<Self::State, String>;

    /// Applies an update from the hosting program.
    fn update(
        &self,
        state: &Self::State,
        update: Self::Update,
    ) -> Result<Change<Self::State>, String>;

    /// Applies an event from an observer. Rejected unless overridden.
    fn event(
        &self,
        state: &Self::State,
        from: ObserverId,
        event: Self::Event,
    ) -> Result<Change<Self::State>, String> {
        let _ = (state, from, event);
        Err(format!("{} does not accept observer events", Self::KIND))
    }
}

/// Adapter exposing a [`TypedModel`] as a [`Model`].
pub struct Typed<M> {
    inner: M,
}

impl<M: TypedModel> Typed<M> {
    /// Wraps a typed model.
    pub fn new(inner: M) -> Self {
        Self { inner }
    }

    /// Returns the wrapped model.
    pub fn inner(&self) -> &M {
        &self.inner
    }
}

fn decode<T: DeserializeOwned>(what: &str, v: &Value) -> Result<T, WidgetError> {
    T::deserialize(v).map_err(|e| WidgetError::invalid(format!("malformed {what}: {e}")))
}

fn encode<T: Serialize>(state: &T) -> Result<Value, WidgetError> {
    serde_json::to_value(state)
        .map_err(|e| WidgetError::invalid(format!("unserializable state: {e}")))
}

impl<M: TypedModel> Model for Typed<M> {
    fn kind(&self) -> &str {
        M::KIND
    }

    fn init(&self, payload: &Value) -> Result<Value, WidgetError> {
        let init: M::Init = decode("init payload", payload)?;
        let state = self.inner.init(init).map_err(WidgetError::invalid)?;
        encode(&state)
    }

    fn apply(&self, state: &Value, input: Input<'_>) -> Result<Transition, WidgetError> {
        let current: M::State = decode("state", state)?;
        let change = match input {
            Input::Update(payload) => {
                let update: M::Update = decode("update payload", payload)?;
                self.inner.update(&current, update)
            }
            Input::ObserverEvent { observer, payload } => {
                let event: M::Event = decode("event payload", payload)?;
                self.inner.event(&current, observer, event)
            }
        }
        .map_err(WidgetError::invalid)?;

        Ok(Transition {
            state: encode(&change.state)?,
            outputs: change.outputs,
        })
    }
}

//! # Builder for [`WidgetManager`].
//!
//! Collects the configuration, the model catalogue and the runtime-event subscribers,
//! then wires the bus to a [`SubscriberSet`] through one listener task.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use super::{config::Config, manager::WidgetManager};
use crate::{
    events::{Bus, Event},
    subscribers::{Subscribe, SubscriberSet},
    widget::{Model, Typed, TypedModel},
};

/// Builder for constructing a [`WidgetManager`].
pub struct WidgetManagerBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    models: HashMap<String, Arc<dyn Model>>,
}

impl WidgetManagerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            models: HashMap::new(),
        }
    }

    /// Sets runtime event subscribers.
    ///
    /// Subscribers receive runtime events (widget lifecycle, rejections, dropped
    /// deliveries) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one runtime event subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Registers a model under its [`Model::kind`]. A later registration of the same
    /// kind replaces the earlier one.
    pub fn with_model(mut self, model: Arc<dyn Model>) -> Self {
        self.models.insert(model.kind().to_string(), model);
        self
    }

    /// Registers a [`TypedModel`] under its `KIND`.
    pub fn with_typed_model<M: TypedModel>(self, model: M) -> Self {
        self.with_model(Arc::new(Typed::new(model)))
    }

    /// Builds the manager.
    ///
    /// Must be called from within a tokio runtime: subscriber workers and the event
    /// listener are spawned here.
    pub fn build(self) -> Arc<WidgetManager> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let listener_token = CancellationToken::new();

        let listener = if self.subscribers.is_empty() {
            None
        } else {
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            Some(tokio::spawn(event_listener(
                bus.subscribe(),
                set,
                listener_token.clone(),
            )))
        };

        Arc::new(WidgetManager::new_internal(
            self.cfg,
            bus,
            self.models,
            listener_token,
            listener,
        ))
    }
}

/// Forwards bus events to the subscriber set until cancelled, then drains what is
/// already buffered and shuts the workers down.
async fn event_listener(
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            msg = rx.recv() => match msg {
                Ok(ev) => set.emit(ev),
                Err(RecvError::Lagged(n)) => {
                    set.emit(Event::subscriber_overflow("event_listener", "lagged")
                        .with_reason(format!("lagged by {n} events")));
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    while let Ok(ev) = rx.try_recv() {
        set.emit(ev);
    }
    set.shutdown().await;
}

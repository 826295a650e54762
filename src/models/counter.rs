//! Integer counter widget.
//!
//! - init: an integer
//! - update: `{"add": n}` or `{"set": n}`
//! - observer event: `"increment"` or `"decrement"`
//!
//! Every applied command broadcasts the new value.

use serde::Deserialize;
use serde_json::json;

use crate::widget::{Change, ObserverId, TypedModel};

/// Counter model (`kind = "counter"`).
#[derive(Debug, Default, Clone, Copy)]
pub struct Counter;

/// Update accepted from the hosting program.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterUpdate {
    Add(i64),
    Set(i64),
}

/// Event accepted from observers.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterEvent {
    Increment,
    Decrement,
}

impl Counter {
    fn step(current: i64, delta: i64) -> Result<Change<i64>, String> {
        let next = current
            .checked_add(delta)
            .ok_or_else(|| format!("counter overflow: {current} + {delta}"))?;
        Ok(Change::new(next).broadcast(json!(next)))
    }
}

impl TypedModel for Counter {
    const KIND: &'static str = "counter";

    type State = i64;
    type Init = i64;
    type Update = CounterUpdate;
    type Event = CounterEvent;

    fn init(&self, init: i64) -> Result<i64, String> {
        Ok(init)
    }

    fn update(&self, state: &i64, update: CounterUpdate) -> Result<Change<i64>, String> {
        match update {
            CounterUpdate::Add(n) => Self::step(*state, n),
            CounterUpdate::Set(n) => Ok(Change::new(n).broadcast(json!(n))),
        }
    }

    fn event(
        &self,
        state: &i64,
        _from: ObserverId,
        event: CounterEvent,
    ) -> Result<Change<i64>, String> {
        match event {
            CounterEvent::Increment => Self::step(*state, 1),
            CounterEvent::Decrement => Self::step(*state, -1),
        }
    }
}

//! # StateCell: authoritative value of one widget.
//!
//! Holds the current [`Value`], the [`Model`] that derives new values, and two counters.
//! The cell is plain data; the owning actor is what serializes access.
//!
//! ## Rules
//! - `apply` commits only on success; a rejected input leaves value and counters unchanged.
//! - `version` increments by exactly one per committed input.
//! - `seq` increments by one per committed broadcast output; replies do not move it.
//! - Replaying a command log with [`StateCell::replay`] yields the same value the actor
//!   would hold after processing that log.

use std::sync::Arc;

use serde_json::Value;

use crate::error::WidgetError;
use crate::widget::model::{Input, Model, Output, Target};
use crate::widget::{Command, Snapshot, WidgetId};

/// Authoritative state of one widget.
pub struct StateCell {
    model: Arc<dyn Model>,
    value: Value,
    version: u64,
    seq: u64,
}

impl StateCell {
    /// Creates a cell from an `Init` payload.
    ///
    /// Fails with [`WidgetError::InvalidCommand`] if the model rejects the payload.
    pub fn init(model: Arc<dyn Model>, payload: &Value) -> Result<Self, WidgetError> {
        let value = model.init(payload)?;
        Ok(Self {
            model,
            value,
            version: 0,
            seq: 0,
        })
    }

    /// Rebuilds a cell by folding a command log.
    ///
    /// The first command must be `Init`. Later `Init`s and rejected inputs are skipped,
    /// as the actor skips them; `Join` and `Leave` do not touch state.
    pub fn replay<'a, I>(model: Arc<dyn Model>, log: I) -> Result<Self, WidgetError>
    where
        I: IntoIterator<Item = &'a Command>,
    {
        let mut log = log.into_iter();
        let mut cell = match log.next() {
            Some(Command::Init(payload)) => Self::init(model, payload)?,
            Some(other) => {
                return Err(WidgetError::invalid(format!(
                    "log must start with init, found {}",
                    other.as_label()
                )));
            }
            None => return Err(WidgetError::invalid("empty command log")),
        };
        for cmd in log {
            if let Some(input) = cmd.as_input() {
                let _ = cell.apply(input);
            }
        }
        Ok(cell)
    }

    /// Applies one input and commits the result.
    ///
    /// Returns the notifications to dispatch; on error nothing is committed.
    pub fn apply(&mut self, input: Input<'_>) -> Result<Vec<Output>, WidgetError> {
        let transition = self.model.apply(&self.value, input)?;
        self.value = transition.state;
        self.version += 1;
        self.seq += transition
            .outputs
            .iter()
            .filter(|o| matches!(o.target, Target::Broadcast))
            .count() as u64;
        Ok(transition.outputs)
    }

    /// Current value.
    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Number of committed inputs.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of broadcast outputs committed so far.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Kind of the backing model.
    #[inline]
    pub fn kind(&self) -> &str {
        self.model.kind()
    }

    /// Copies the current state into a [`Snapshot`].
    pub fn snapshot(&self, widget: WidgetId) -> Snapshot {
        Snapshot {
            widget,
            version: self.version,
            seq: self.seq,
            state: self.value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Counter;
    use crate::widget::model::Typed;
    use crate::widget::{ObserverHandle, ObserverId};
    use serde_json::json;

    fn counter() -> Arc<dyn Model> {
        Arc::new(Typed::new(Counter))
    }

    #[test]
    fn rejected_input_leaves_state_untouched() {
        let mut cell = StateCell::init(counter(), &json!(5)).unwrap();
        let err = cell.apply(Input::Update(&json!("nope"))).unwrap_err();
        assert_eq!(err.as_label(), "invalid_command");
        assert_eq!(cell.value(), &json!(5));
        assert_eq!(cell.version(), 0);
    }

    #[test]
    fn apply_is_deterministic() {
        let mut a = StateCell::init(counter(), &json!(0)).unwrap();
        let mut b = StateCell::init(counter(), &json!(0)).unwrap();
        let out_a = a.apply(Input::Update(&json!({"add": 3}))).unwrap();
        let out_b = b.apply(Input::Update(&json!({"add": 3}))).unwrap();
        assert_eq!(out_a, out_b);
        assert_eq!(a.value(), b.value());
        assert_eq!(a.version(), 1);
    }

    #[test]
    fn replay_equals_left_fold() {
        let (h, _s) = ObserverHandle::channel(1);
        let log = vec![
            Command::Init(json!(10)),
            Command::Update(json!({"add": 1})),
            Command::Join(h.clone()),
            Command::Update(json!({"bogus": true})),
            Command::ObserverEvent(h.id(), json!("increment")),
            Command::Init(json!(99)),
            Command::Leave(h.id()),
            Command::Update(json!({"add": -4})),
        ];

        let cell = StateCell::replay(counter(), &log).unwrap();

        let mut folded = StateCell::init(counter(), &json!(10)).unwrap();
        for input in [
            Input::Update(&json!({"add": 1})),
            Input::ObserverEvent {
                observer: h.id(),
                payload: &json!("increment"),
            },
            Input::Update(&json!({"add": -4})),
        ] {
            folded.apply(input).unwrap();
        }

        assert_eq!(cell.value(), &json!(8));
        assert_eq!(cell.value(), folded.value());
        assert_eq!(cell.version(), folded.version());
    }

    #[test]
    fn seq_counts_broadcasts_only() {
        let model: Arc<dyn Model> = Arc::new(Typed::new(crate::models::Markers));
        let mut cell = StateCell::init(model, &json!([])).unwrap();
        let asker = ObserverId::next();

        cell.apply(Input::Update(&json!({"add": {"id": "a", "lat": 1.0, "lon": 2.0}})))
            .unwrap();
        cell.apply(Input::ObserverEvent {
            observer: asker,
            payload: &json!({"inspect": "a"}),
        })
        .unwrap();

        assert_eq!(cell.version(), 2);
        assert_eq!(cell.seq(), 1);
        assert_eq!(cell.snapshot(WidgetId::from_raw(1)).seq, 1);
    }

    #[test]
    fn replay_requires_leading_init() {
        let log = [Command::Leave(ObserverId::next())];
        assert!(StateCell::replay(counter(), &log).is_err());
        assert!(StateCell::replay(counter(), std::iter::empty()).is_err());
    }
}

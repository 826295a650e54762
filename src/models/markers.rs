//! Map-marker list widget.
//!
//! State is an ordered list of [`Marker`]s with unique ids. Updates broadcast deltas
//! rather than the whole list:
//!
//! ```text
//! {"add": {"id": "m1", "lat": 52.5, "lon": 13.4}}  ──► {"op": "add",    "marker": {...}}
//! {"remove": "m1"}                                 ──► {"op": "remove", "id": "m1"}
//! "clear"                                          ──► {"op": "clear"}
//! observer {"move": {"id": "m1", "lat": .., "lon": ..}} ──► {"op": "move", ...}
//! observer {"inspect": "m1"}                       ──► reply to that observer only
//! ```

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::widget::{Change, ObserverId, TypedModel};

/// One marker on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Marker {
    fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("marker id must not be empty".into());
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(format!("latitude {} out of range", self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(format!("longitude {} out of range", self.lon));
        }
        Ok(())
    }
}

/// Update accepted from the hosting program.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkersUpdate {
    Add(Marker),
    Remove(String),
    Clear,
}

/// Target position of a dragged marker.
#[derive(Debug, Clone, Deserialize)]
pub struct MoveTo {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
}

/// Event accepted from observers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkersEvent {
    Move(MoveTo),
    Inspect(String),
}

/// Marker list model (`kind = "markers"`).
#[derive(Debug, Default, Clone, Copy)]
pub struct Markers;

fn position(state: &[Marker], id: &str) -> Result<usize, String> {
    state
        .iter()
        .position(|m| m.id == id)
        .ok_or_else(|| format!("no marker {id:?}"))
}

impl TypedModel for Markers {
    const KIND: &'static str = "markers";

    type State = Vec<Marker>;
    type Init = Vec<Marker>;
    type Update = MarkersUpdate;
    type Event = MarkersEvent;

    fn init(&self, init: Vec<Marker>) -> Result<Vec<Marker>, String> {
        let mut seen = std::collections::HashSet::new();
        for m in &init {
            m.validate()?;
            if !seen.insert(m.id.as_str()) {
                return Err(format!("duplicate marker {:?}", m.id));
            }
        }
        Ok(init)
    }

    fn update(
        &self,
        state: &Vec<Marker>,
        update: MarkersUpdate,
    ) -> Result<Change<Vec<Marker>>, String> {
        match update {
            MarkersUpdate::Add(marker) => {
                marker.validate()?;
                if state.iter().any(|m| m.id == marker.id) {
                    return Err(format!("duplicate marker {:?}", marker.id));
                }
                let payload = json!({ "op": "add", "marker": marker });
                let mut next = state.clone();
                next.push(marker);
                Ok(Change::new(next).broadcast(payload))
            }
            MarkersUpdate::Remove(id) => {
                let idx = position(state, &id)?;
                let mut next = state.clone();
                next.remove(idx);
                Ok(Change::new(next).broadcast(json!({ "op": "remove", "id": id })))
            }
            MarkersUpdate::Clear => Ok(Change::new(Vec::new()).broadcast(json!({ "op": "clear" }))),
        }
    }

    fn event(
        &self,
        state: &Vec<Marker>,
        from: ObserverId,
        event: MarkersEvent,
    ) -> Result<Change<Vec<Marker>>, String> {
        match event {
            MarkersEvent::Move(to) => {
                let idx = position(state, &to.id)?;
                let mut next = state.clone();
                let moved = Marker {
                    lat: to.lat,
                    lon: to.lon,
                    ..next[idx].clone()
                };
                moved.validate()?;
                next[idx] = moved.clone();
                let payload = json!({ "op": "move", "marker": moved, "by": from });
                Ok(Change::new(next).broadcast(payload))
            }
            MarkersEvent::Inspect(id) => {
                let idx = position(state, &id)?;
                let payload = json!({ "op": "inspect", "marker": state[idx] });
                Ok(Change::new(state.clone()).reply(from, payload))
            }
        }
    }
}

//! # Observer registry of one widget.
//!
//! The set of observers currently joined to a widget. It is owned by the widget's actor
//! and only touched from the actor loop, so it carries no lock.
//!
//! ## Rules
//! - Membership is unique per [`ObserverId`].
//! - `add` of a present observer and `remove` of an absent one are no-ops.
//! - A re-join with a new handle for the same id replaces the stored sink.

use std::collections::HashMap;

use crate::widget::{ObserverHandle, ObserverId};

/// Observers joined to one widget.
#[derive(Debug, Default)]
pub struct ObserverRegistry {
    members: HashMap<ObserverId, ObserverHandle>,
}

impl ObserverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer. Returns `true` if it was not already a member.
    pub fn add(&mut self, handle: ObserverHandle) -> bool {
        self.members.insert(handle.id(), handle).is_none()
    }

    /// Unregisters an observer, returning its handle if it was a member.
    pub fn remove(&mut self, id: ObserverId) -> Option<ObserverHandle> {
        self.members.remove(&id)
    }

    /// Returns the handle of a member.
    pub fn get(&self, id: ObserverId) -> Option<&ObserverHandle> {
        self.members.get(&id)
    }

    #[inline]
    pub fn contains(&self, id: ObserverId) -> bool {
        self.members.contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Current members, in no particular order.
    pub fn snapshot(&self) -> impl Iterator<Item = &ObserverHandle> {
        self.members.values()
    }

    /// Sorted ids of current members.
    pub fn ids(&self) -> Vec<ObserverId> {
        let mut ids: Vec<ObserverId> = self.members.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Removes every member.
    pub fn clear(&mut self) {
        self.members.clear();
    }
}

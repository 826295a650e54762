//! # Identifiers for widgets and observers.
//!
//! - [`WidgetId`] is issued by the [`WidgetManager`](crate::WidgetManager) from a
//!   per-manager monotonic counter. Ids are never reused, which lets the manager tell
//!   a closed widget (`id < next`) from one that never existed.
//! - [`ObserverId`] is issued from a process-wide counter when an
//!   [`ObserverHandle`](crate::ObserverHandle) is created.
//!
//! Both render as `w-<n>` / `o-<n>` and parse back from that form, so a transport can
//! carry them as plain strings.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};

/// Global counter for observer identities.
static OBSERVER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Opaque, never-reused identifier of one widget instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(u64);

impl WidgetId {
    /// Wraps a raw id (e.g. one received from a transport).
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w-{}", self.0)
    }
}

/// Identity of one connected observer.
///
/// Registry membership and deduplication are keyed by this value only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Allocates the next process-unique observer id.
    pub fn next() -> Self {
        Self(OBSERVER_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Wraps a raw id.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "o-{}", self.0)
    }
}

/// Error returned when an id string is not of the form `<prefix>-<n>` (or a bare number).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed id {input:?}")]
pub struct ParseIdError {
    input: String,
}

fn parse_prefixed(s: &str, prefix: &str) -> Result<u64, ParseIdError> {
    let digits = s
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .unwrap_or(s);
    digits.parse::<u64>().map_err(|_| ParseIdError {
        input: s.to_string(),
    })
}

impl FromStr for WidgetId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed(s, "w").map(Self)
    }
}

impl FromStr for ObserverId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed(s, "o").map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widget_id_display_and_parse_agree() {
        let id = WidgetId::from_raw(42);
        assert_eq!(id.to_string(), "w-42");
        assert_eq!("w-42".parse::<WidgetId>().unwrap(), id);
        assert_eq!("42".parse::<WidgetId>().unwrap(), id);
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert!("w-".parse::<WidgetId>().is_err());
        assert!("o-x1".parse::<ObserverId>().is_err());
        assert!("w-7".parse::<ObserverId>().is_err());
    }

    #[test]
    fn observer_ids_are_unique() {
        let a = ObserverId::next();
        let b = ObserverId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }
}

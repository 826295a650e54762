//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the widget manager runtime.
//!
//! ## Sentinel values
//! - `Retention::IdleFor(Duration::ZERO)` behaves like [`Retention::Manual`]
//! - capacities of `0` are clamped to `1`

use std::time::Duration;

/// What happens to a widget nobody is watching.
///
/// The runtime never guesses: a widget is collected only by an explicit
/// [`close`](crate::WidgetManager::close), by actor termination, or by the rule chosen here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Retention {
    /// Keep the widget until it is closed.
    #[default]
    Manual,
    /// Retire the widget after it has had no observers and received no command for the
    /// given duration.
    IdleFor(Duration),
}

impl Retention {
    /// Idle timeout, if one is active.
    #[inline]
    pub fn idle_timeout(&self) -> Option<Duration> {
        match *self {
            Retention::IdleFor(d) if d > Duration::ZERO => Some(d),
            _ => None,
        }
    }
}

/// Global configuration for the widget manager.
///
/// ## Field semantics
/// - `bus_capacity`: runtime event ring buffer size (min 1; clamped by Bus)
/// - `command_capacity`: per-widget command queue; senders wait when it is full
/// - `observer_capacity`: default queue size for [`WidgetManager::observer`](crate::WidgetManager::observer)
/// - `prune_closed_observers`: drop registry members whose stream is gone
/// - `retention`: collection rule for unobserved widgets
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the runtime event broadcast channel.
    pub bus_capacity: usize,

    /// Capacity of each widget actor's command queue.
    ///
    /// This is the backpressure point: a flood of commands to one widget makes its
    /// submitters wait without affecting other widgets.
    pub command_capacity: usize,

    /// Default notification queue size for observers created by the manager.
    pub observer_capacity: usize,

    /// Remove observers from the registry once their stream has been dropped.
    ///
    /// A later `Leave` for a pruned observer is a no-op.
    pub prune_closed_observers: bool,

    /// Retention rule for widgets with no observers.
    pub retention: Retention,
}

impl Config {
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    #[inline]
    pub fn command_capacity_clamped(&self) -> usize {
        self.command_capacity.max(1)
    }

    #[inline]
    pub fn observer_capacity_clamped(&self) -> usize {
        self.observer_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `command_capacity = 256`
    /// - `observer_capacity = 64`
    /// - `prune_closed_observers = true`
    /// - `retention = Retention::Manual`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            command_capacity: 256,
            observer_capacity: 64,
            prune_closed_observers: true,
            retention: Retention::Manual,
        }
    }
}

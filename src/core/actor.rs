//! # WidgetActor: serialized owner of one widget.
//!
//! Owns one widget's [`StateCell`], [`ObserverRegistry`] and [`Outbox`], and processes
//! its commands strictly one at a time in arrival order.
//!
//! ## Command flow
//! ```text
//! Join(h)          → snapshot ──► h only → registry.add(h)            → ObserverJoined
//! Leave(id)        → registry.remove(id)                             → ObserverLeft
//! Update(p)        → cell.apply ─┬─ Ok  → outputs ──► registry snapshot → UpdateApplied
//! ObserverEvent(p) ──────────────┘  Err → reply/error notice            → CommandRejected
//! Init(p)          → rejected (the cell was initialised at creation)
//! ```
//!
//! ## Architecture
//! ```text
//! WidgetManager ──► mpsc (bounded) ──► WidgetActor::run()
//!
//! loop {
//!   select (biased) {
//!     token cancelled        → exit Closed
//!     envelope received      → handle(envelope)
//!     queue disconnected     → exit Disconnected
//!     idle timer (retention) → exit Retired
//!   }
//! }
//! on exit: close queue, answer every queued request with Closed
//! ```
//!
//! ## Rules
//! - An observer is a member only once its snapshot is queued; a join whose snapshot
//!   cannot be queued is rejected.
//! - Only broadcasts advance the notification `seq`; replies and errors carry the current one.
//! - A join at queue position *k* snapshots the state produced by commands *1..k-1*;
//!   every later change reaches that observer only through broadcast.
//! - Broadcast recipients are the registry members at the instant of application.
//! - Rejected commands never change state and never stop the loop.
//! - A panic in the model unwinds out of `run`; the manager turns it into
//!   `ActorTerminated` for this widget only.

use std::sync::Arc;

use tokio::{select, sync::mpsc, time};
use tokio_util::sync::CancellationToken;

use crate::core::config::Retention;
use crate::error::{DeliveryError, WidgetError};
use crate::events::{Bus, Event, EventKind};
use crate::widget::{
    Command, Envelope, Notification, ObserverHandle, ObserverId, ObserverRegistry, Outbox, Reply,
    StateCell, Target, WidgetId,
};

/// Why an actor loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActorExit {
    /// Cancelled by `close` or manager shutdown.
    Closed,
    /// Every sender was dropped.
    Disconnected,
    /// Retention policy fired.
    Retired,
}

/// Final report of a finished actor.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ActorReport {
    pub exit: ActorExit,
    pub version: u64,
}

/// Parameters for a widget actor, taken from [`Config`](crate::Config).
#[derive(Clone, Copy, Debug)]
pub(crate) struct WidgetActorParams {
    /// Collection rule for unobserved widgets.
    pub retention: Retention,
    /// Remove members whose stream is gone.
    pub prune_closed_observers: bool,
}

/// Serialized owner of one widget's state and observers.
pub(crate) struct WidgetActor {
    id: WidgetId,
    cell: StateCell,
    registry: ObserverRegistry,
    outbox: Outbox,
    bus: Bus,
    params: WidgetActorParams,
}

impl WidgetActor {
    /// Creates an actor around an initialised cell.
    pub(crate) fn new(id: WidgetId, cell: StateCell, bus: Bus, params: WidgetActorParams) -> Self {
        Self {
            id,
            cell,
            registry: ObserverRegistry::new(),
            outbox: Outbox::new(id, bus.clone()),
            bus,
            params,
        }
    }

    /// Runs the actor until cancellation, disconnection or retirement.
    ///
    /// Commands still queued when the loop ends are answered with
    /// [`WidgetError::Closed`].
    pub(crate) async fn run(
        mut self,
        mut rx: mpsc::Receiver<Envelope>,
        token: CancellationToken,
    ) -> ActorReport {
        let exit = loop {
            let idle = self
                .params
                .retention
                .idle_timeout()
                .filter(|_| self.registry.is_empty());
            let idle_timer = async move {
                match idle {
                    Some(d) => time::sleep(d).await,
                    None => std::future::pending::<()>().await,
                }
            };

            select! {
                biased;
                _ = token.cancelled() => break ActorExit::Closed,
                msg = rx.recv() => match msg {
                    Some(envelope) => self.handle(envelope),
                    None => break ActorExit::Disconnected,
                },
                _ = idle_timer => break ActorExit::Retired,
            }
        };

        rx.close();
        while let Ok(envelope) = rx.try_recv() {
            envelope.fail(WidgetError::Closed { widget: self.id });
        }
        self.registry.clear();

        ActorReport {
            exit,
            version: self.cell.version(),
        }
    }

    /// Dispatches one envelope.
    fn handle(&mut self, envelope: Envelope) {
        let Envelope { command, reply } = envelope;
        match command {
            Command::Join(handle) => self.on_join(handle, reply),
            Command::Leave(observer) => self.on_leave(observer, reply),
            Command::Init(_) => self.reject(
                &command,
                reply,
                WidgetError::invalid("widget already initialized"),
            ),
            Command::Update(_) | Command::ObserverEvent(..) => self.on_change(&command, reply),
        }
    }

    /// Sends the current state to an observer, then registers it.
    ///
    /// An observer whose queue cannot take the snapshot is not registered: it would
    /// otherwise receive changes with no state to apply them to.
    fn on_join(&mut self, handle: ObserverHandle, reply: Option<Reply>) {
        let observer = handle.id();
        let snapshot = self.cell.snapshot(self.id);

        let delivered = self
            .outbox
            .deliver(&handle, Arc::new(Notification::from(&snapshot)));
        if let Err(reason) = delivered {
            let err = WidgetError::ObserverUnreachable {
                widget: self.id,
                observer,
                reason,
            };
            self.bus.publish(
                Event::new(EventKind::CommandRejected)
                    .with_widget(self.id)
                    .with_observer(observer)
                    .with_command("join")
                    .with_reason(err.to_string()),
            );
            if let Some(reply) = reply {
                reply.fail(err);
            }
            return;
        }

        self.registry.add(handle);
        self.bus.publish(
            Event::new(EventKind::ObserverJoined)
                .with_widget(self.id)
                .with_observer(observer)
                .with_version(snapshot.version),
        );

        if let Some(reply) = reply {
            reply.joined(snapshot);
        }
    }

    /// Unregisters an observer.
    fn on_leave(&mut self, observer: ObserverId, reply: Option<Reply>) {
        if self.registry.remove(observer).is_some() {
            self.bus.publish(
                Event::new(EventKind::ObserverLeft)
                    .with_widget(self.id)
                    .with_observer(observer),
            );
        }
        if let Some(reply) = reply {
            reply.applied(self.cell.version());
        }
    }

    /// Applies an update or observer event and fans out its outputs.
    fn on_change(&mut self, command: &Command, reply: Option<Reply>) {
        if let Some(origin) = command.observer() {
            if !self.registry.contains(origin) {
                let err = WidgetError::invalid(format!("observer {origin} has not joined"));
                return self.reject(command, reply, err);
            }
        }
        let Some(input) = command.as_input() else {
            return;
        };

        let mut seq = self.cell.seq();
        let outputs = match self.cell.apply(input) {
            Ok(outputs) => outputs,
            Err(err) => return self.reject(command, reply, err),
        };

        let version = self.cell.version();
        let mut recipients = 0usize;
        let mut gone = Vec::new();
        for output in outputs {
            match output.target {
                Target::Broadcast => {
                    seq += 1;
                    let notification = Notification::event(self.id, seq, output.payload);
                    let dispatch = self.outbox.broadcast(&self.registry, notification);
                    recipients += dispatch.offered;
                    gone.extend(dispatch.gone);
                }
                Target::Observer(to) => {
                    if let Some(handle) = self.registry.get(to) {
                        recipients += 1;
                        let notification = Notification::reply(self.id, seq, output.payload);
                        if self.outbox.deliver(handle, Arc::new(notification))
                            == Err(DeliveryError::Gone)
                        {
                            gone.push(to);
                        }
                    }
                }
            }
        }

        self.bus.publish(
            Event::new(EventKind::UpdateApplied)
                .with_widget(self.id)
                .with_observer_opt(command.observer())
                .with_command(command.as_label())
                .with_version(version)
                .with_recipients(recipients),
        );
        self.prune(&gone);

        if let Some(reply) = reply {
            reply.applied(version);
        }
    }

    /// Reports a rejected command to whoever can hear it.
    ///
    /// - synchronous caller: error reply
    /// - fire-and-forget observer event: error notification to that observer
    /// - otherwise: only the `CommandRejected` event
    fn reject(&mut self, command: &Command, reply: Option<Reply>, err: WidgetError) {
        self.bus.publish(
            Event::new(EventKind::CommandRejected)
                .with_widget(self.id)
                .with_observer_opt(command.observer())
                .with_command(command.as_label())
                .with_reason(err.to_string()),
        );

        match reply {
            Some(reply) => reply.fail(err),
            None => {
                if let Command::ObserverEvent(origin, _) = command {
                    if let Some(handle) = self.registry.get(*origin) {
                        let note = Notification::error(self.id, self.cell.seq(), &err);
                        let _ = self.outbox.deliver(handle, Arc::new(note));
                    }
                }
            }
        }
    }

    /// Removes observers whose stream is gone (if pruning is enabled).
    fn prune(&mut self, gone: &[ObserverId]) {
        if !self.params.prune_closed_observers {
            return;
        }
        for &observer in gone {
            if self.registry.remove(observer).is_some() {
                self.bus.publish(
                    Event::new(EventKind::ObserverPruned)
                        .with_widget(self.id)
                        .with_observer(observer),
                );
            }
        }
    }
}

//! # Commands addressed to one widget.
//!
//! [`Command`] is the closed set of things a widget actor accepts. The transport
//! translates inbound requests into one of these and hands it to the
//! [`WidgetManager`](crate::WidgetManager).
//!
//! | Variant         | Mutates state | Produces                                   |
//! |-----------------|---------------|--------------------------------------------|
//! | `Init`          | yes (once)    | nothing (rejected after creation)          |
//! | `Join`          | no            | one snapshot to the joining observer       |
//! | `Update`        | yes           | model outputs (usually a broadcast)        |
//! | `ObserverEvent` | yes           | model outputs; error notice to originator  |
//! | `Leave`         | no            | nothing                                    |

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::WidgetError;
use crate::widget::model::Input;
use crate::widget::{ObserverHandle, ObserverId, Snapshot};

/// One command for a widget actor. Immutable once created.
#[derive(Debug, Clone)]
pub enum Command {
    /// Initial state payload; only valid as the widget's first command.
    Init(Value),
    /// Register an observer and send it a snapshot.
    Join(ObserverHandle),
    /// Change issued by the hosting program.
    Update(Value),
    /// Change originated by a joined observer.
    ObserverEvent(ObserverId, Value),
    /// Unregister an observer.
    Leave(ObserverId),
}

impl Command {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Command::Init(_) => "init",
            Command::Join(_) => "join",
            Command::Update(_) => "update",
            Command::ObserverEvent(..) => "observer_event",
            Command::Leave(_) => "leave",
        }
    }

    /// Returns the observer this command concerns, if any.
    pub fn observer(&self) -> Option<ObserverId> {
        match self {
            Command::Join(h) => Some(h.id()),
            Command::ObserverEvent(id, _) | Command::Leave(id) => Some(*id),
            Command::Init(_) | Command::Update(_) => None,
        }
    }

    /// Returns the model input for state-changing commands.
    ///
    /// `Init`, `Join` and `Leave` never go through [`Model::apply`](crate::Model::apply).
    pub fn as_input(&self) -> Option<Input<'_>> {
        match self {
            Command::Update(payload) => Some(Input::Update(payload)),
            Command::ObserverEvent(observer, payload) => Some(Input::ObserverEvent {
                observer: *observer,
                payload,
            }),
            Command::Init(_) | Command::Join(_) | Command::Leave(_) => None,
        }
    }
}

/// Reply expected by a synchronous caller.
pub(crate) enum Reply {
    /// `join`: the snapshot that was sent to the observer.
    Joined(oneshot::Sender<Result<Snapshot, WidgetError>>),
    /// `update`: the version produced by the applied command.
    Applied(oneshot::Sender<Result<u64, WidgetError>>),
}

impl Reply {
    /// Answers with the snapshot produced by a join.
    pub(crate) fn joined(self, snapshot: Snapshot) {
        match self {
            Reply::Joined(tx) => {
                let _ = tx.send(Ok(snapshot));
            }
            Reply::Applied(tx) => {
                let _ = tx.send(Ok(snapshot.version));
            }
        }
    }

    /// Answers with the version produced by an applied command.
    pub(crate) fn applied(self, version: u64) {
        if let Reply::Applied(tx) = self {
            let _ = tx.send(Ok(version));
        }
    }

    /// Answers with an error.
    pub(crate) fn fail(self, err: WidgetError) {
        match self {
            Reply::Joined(tx) => {
                let _ = tx.send(Err(err));
            }
            Reply::Applied(tx) => {
                let _ = tx.send(Err(err));
            }
        }
    }
}

/// Command plus an optional reply channel, as queued to an actor.
pub(crate) struct Envelope {
    pub(crate) command: Command,
    pub(crate) reply: Option<Reply>,
}

impl Envelope {
    /// Fire-and-forget envelope.
    pub(crate) fn tell(command: Command) -> Self {
        Self {
            command,
            reply: None,
        }
    }

    /// Envelope whose originator awaits a reply.
    pub(crate) fn ask(command: Command, reply: Reply) -> Self {
        Self {
            command,
            reply: Some(reply),
        }
    }

    /// Answers the originator with an error (no-op for fire-and-forget).
    pub(crate) fn fail(self, err: WidgetError) {
        if let Some(reply) = self.reply {
            reply.fail(err);
        }
    }
}

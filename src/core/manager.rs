//! # WidgetManager: process-wide table of widget actors.
//!
//! The [`WidgetManager`] owns the event bus, the model catalogue and the table mapping
//! each [`WidgetId`] to its actor. It routes commands, creates actors, and removes
//! them when they are closed, retired or die.
//!
//! ## Key responsibilities
//! - create widgets (`Init`) and spawn one [`WidgetActor`] per widget
//! - route commands by id, distinguishing `NotFound` from `Closed`
//! - synchronous `join` / `update`, fire-and-forget `send` / `leave` / `observer_event`
//! - detect actor termination (panic) and clean up only that widget
//! - fan runtime events out to [`Subscribe`](crate::Subscribe) implementations
//!
//! ## High-level architecture
//! ```text
//! create_widget(kind, init)
//!   ├─► catalogue lookup ─► StateCell::init (InvalidCommand on bad payload)
//!   ├─► table.write(): id = next_id++, insert entry { tx, token, join }
//!   └─► tokio::spawn( catch_unwind( WidgetActor::run(rx, token) ) )
//!                          └─► on exit: table.remove(id), publish
//!                                WidgetClosed | WidgetRetired | ActorTerminated
//!
//! send(id, cmd) / join / update ...
//!   table.read() ─► clone tx ─► release lock ─► tx.send(envelope).await
//!
//! close(id)
//!   table.write().remove(id) ─► token.cancel() ─► await actor exit
//! ```
//!
//! ## Rules
//! - The table is the only shared mutable structure; it is never locked while awaiting
//!   an actor.
//! - Ids come from a monotonic counter and are never reused, so an absent id below the
//!   counter is `Closed` and anything else is `NotFound`.
//! - `close` is idempotent: closing a closed widget returns `Ok(())`.
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use widgetsync::{Config, WidgetManager, models::Counter};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), widgetsync::WidgetError> {
//!     let manager = WidgetManager::builder(Config::default())
//!         .with_typed_model(Counter)
//!         .build();
//!
//!     let id = manager.create_widget("counter", json!(0)).await?;
//!     let (observer, mut stream) = manager.observer();
//!
//!     let snapshot = manager.join(id, observer.clone()).await?;
//!     assert_eq!(snapshot.state, json!(0));
//!
//!     manager.update(id, json!({"add": 1})).await?;
//!     stream.recv().await; // snapshot
//!     let event = stream.recv().await.expect("broadcast");
//!     assert_eq!(event.payload, json!(1));
//!
//!     manager.leave(id, observer.id()).await?;
//!     manager.close(id).await?;
//!     manager.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, Weak};

use futures::FutureExt;
use serde_json::Value;
use tokio::sync::{RwLock, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::actor::{ActorExit, ActorReport, WidgetActor, WidgetActorParams};
use crate::core::config::Config;
use crate::error::WidgetError;
use crate::events::{Bus, Event, EventKind};
use crate::widget::{
    Command, Envelope, Model, ObserverHandle, ObserverId, ObserverStream, Reply, Snapshot,
    StateCell, WidgetId,
};

/// Handle to a running widget actor.
struct WidgetEntry {
    /// Actor command queue.
    tx: mpsc::Sender<Envelope>,
    /// Individual cancellation token for this widget.
    cancel: CancellationToken,
    /// Join handle of the supervised actor task.
    join: JoinHandle<()>,
}

/// Widget table guarded by the manager's lock.
struct Table {
    widgets: HashMap<WidgetId, WidgetEntry>,
    next_id: u64,
}

impl Table {
    fn lookup(&self, id: WidgetId) -> Result<mpsc::Sender<Envelope>, WidgetError> {
        match self.widgets.get(&id) {
            Some(entry) => Ok(entry.tx.clone()),
            None if id.as_u64() > 0 && id.as_u64() < self.next_id => {
                Err(WidgetError::Closed { widget: id })
            }
            None => Err(WidgetError::NotFound { widget: id }),
        }
    }
}

/// Routes commands to widget actors and manages their lifecycle.
pub struct WidgetManager {
    cfg: Config,
    bus: Bus,
    models: HashMap<String, Arc<dyn Model>>,
    table: Arc<RwLock<Table>>,
    runtime_token: CancellationToken,
    listener_token: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl WidgetManager {
    /// Returns a builder for configuring a manager.
    pub fn builder(cfg: Config) -> crate::WidgetManagerBuilder {
        crate::WidgetManagerBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        models: HashMap<String, Arc<dyn Model>>,
        listener_token: CancellationToken,
        listener: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            cfg,
            bus,
            models,
            table: Arc::new(RwLock::new(Table {
                widgets: HashMap::new(),
                next_id: 1,
            })),
            runtime_token: CancellationToken::new(),
            listener_token,
            listener: Mutex::new(listener),
        }
    }

    /// Configuration the manager was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Subscribes to runtime events published after this call.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Creates an observer whose queue holds `Config::observer_capacity` notifications.
    pub fn observer(&self) -> (ObserverHandle, ObserverStream) {
        ObserverHandle::channel(self.cfg.observer_capacity_clamped())
    }

    /// Registered model kinds, sorted.
    pub fn model_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.models.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Creates a widget of a registered model kind from its `Init` payload.
    pub async fn create_widget(&self, kind: &str, init: Value) -> Result<WidgetId, WidgetError> {
        let model = self
            .models
            .get(kind)
            .cloned()
            .ok_or_else(|| WidgetError::UnknownModel {
                kind: kind.to_string(),
            })?;
        self.create_with(model, init).await
    }

    /// Creates a widget backed by an unregistered model.
    pub async fn create_with(
        &self,
        model: Arc<dyn Model>,
        init: Value,
    ) -> Result<WidgetId, WidgetError> {
        let kind: Arc<str> = Arc::from(model.kind());
        let cell = StateCell::init(model, &init).inspect_err(|err| {
            self.bus.publish(
                Event::new(EventKind::CommandRejected)
                    .with_command("init")
                    .with_model(Arc::clone(&kind))
                    .with_reason(err.to_string()),
            );
        })?;

        let (tx, rx) = mpsc::channel(self.cfg.command_capacity_clamped());
        let cancel = self.runtime_token.child_token();

        let mut table = self.table.write().await;
        let id = WidgetId::from_raw(table.next_id);
        table.next_id += 1;

        let actor = WidgetActor::new(
            id,
            cell,
            self.bus.clone(),
            WidgetActorParams {
                retention: self.cfg.retention,
                prune_closed_observers: self.cfg.prune_closed_observers,
            },
        );
        let join = tokio::spawn(supervise(
            id,
            actor.run(rx, cancel.clone()),
            Arc::downgrade(&self.table),
            self.bus.clone(),
        ));
        table.widgets.insert(id, WidgetEntry { tx, cancel, join });
        drop(table);

        self.bus.publish(
            Event::new(EventKind::WidgetCreated)
                .with_widget(id)
                .with_model(kind),
        );
        Ok(id)
    }

    /// Routes a command without waiting for it to be applied.
    ///
    /// Waits only if the widget's command queue is full. Outcomes of the command
    /// itself (rejections, deliveries) are reported as runtime events, or as an error
    /// notification to the originating observer.
    pub async fn send(&self, id: WidgetId, command: Command) -> Result<(), WidgetError> {
        self.dispatch(id, Envelope::tell(command)).await
    }

    /// Joins an observer and waits for the snapshot it was sent.
    ///
    /// The same snapshot is also the first notification on the observer's stream.
    pub async fn join(
        &self,
        id: WidgetId,
        observer: ObserverHandle,
    ) -> Result<Snapshot, WidgetError> {
        let (tx, rx) = oneshot::channel();
        self.dispatch(id, Envelope::ask(Command::Join(observer), Reply::Joined(tx)))
            .await?;
        rx.await
            .map_err(|_| WidgetError::ActorTerminated { widget: id })?
    }

    /// Applies an update and waits for the resulting version.
    pub async fn update(&self, id: WidgetId, payload: Value) -> Result<u64, WidgetError> {
        let (tx, rx) = oneshot::channel();
        self.dispatch(id, Envelope::ask(Command::Update(payload), Reply::Applied(tx)))
            .await?;
        rx.await
            .map_err(|_| WidgetError::ActorTerminated { widget: id })?
    }

    /// Forwards an event originated by a joined observer (fire-and-forget).
    pub async fn observer_event(
        &self,
        id: WidgetId,
        observer: ObserverId,
        payload: Value,
    ) -> Result<(), WidgetError> {
        self.send(id, Command::ObserverEvent(observer, payload)).await
    }

    /// Removes an observer (fire-and-forget).
    pub async fn leave(&self, id: WidgetId, observer: ObserverId) -> Result<(), WidgetError> {
        self.send(id, Command::Leave(observer)).await
    }

    /// Closes a widget: removes it, stops its actor, fails its queued commands with
    /// `Closed`, and waits for teardown.
    ///
    /// Closing an already closed widget is a no-op.
    pub async fn close(&self, id: WidgetId) -> Result<(), WidgetError> {
        let entry = {
            let mut table = self.table.write().await;
            match table.widgets.remove(&id) {
                Some(entry) => entry,
                None if id.as_u64() > 0 && id.as_u64() < table.next_id => return Ok(()),
                None => return Err(WidgetError::NotFound { widget: id }),
            }
        };
        entry.cancel.cancel();
        drop(entry.tx);
        let _ = entry.join.await;
        Ok(())
    }

    /// Ids of live widgets, sorted.
    pub async fn list(&self) -> Vec<WidgetId> {
        let table = self.table.read().await;
        let mut ids: Vec<WidgetId> = table.widgets.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns true if the widget is live.
    pub async fn contains(&self, id: WidgetId) -> bool {
        self.table.read().await.widgets.contains_key(&id)
    }

    /// Number of live widgets.
    pub async fn len(&self) -> usize {
        self.table.read().await.widgets.len()
    }

    /// Returns true if no widget is live.
    pub async fn is_empty(&self) -> bool {
        self.table.read().await.widgets.is_empty()
    }

    /// Closes every widget and stops the subscriber workers.
    ///
    /// Widgets created afterwards start closed.
    pub async fn shutdown(&self) {
        self.runtime_token.cancel();

        let entries: Vec<WidgetEntry> = {
            let mut table = self.table.write().await;
            table.widgets.drain().map(|(_, e)| e).collect()
        };
        for entry in entries {
            let _ = entry.join.await;
        }

        self.listener_token.cancel();
        let listener = match self.listener.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(listener) = listener {
            let _ = listener.await;
        }
    }

    async fn dispatch(&self, id: WidgetId, envelope: Envelope) -> Result<(), WidgetError> {
        let tx = self.table.read().await.lookup(id)?;
        tx.send(envelope)
            .await
            .map_err(|_| WidgetError::Closed { widget: id })
    }
}

impl Drop for WidgetManager {
    /// Stops every actor and the event listener; `shutdown` additionally waits for them.
    fn drop(&mut self) {
        self.runtime_token.cancel();
        self.listener_token.cancel();
    }
}

/// Runs one actor, then removes its table entry and reports how it ended.
async fn supervise<F>(id: WidgetId, run: F, table: Weak<RwLock<Table>>, bus: Bus)
where
    F: std::future::Future<Output = ActorReport> + Send,
{
    let outcome = AssertUnwindSafe(run).catch_unwind().await;

    if let Some(table) = table.upgrade() {
        table.write().await.widgets.remove(&id);
    }

    let event = match outcome {
        Ok(ActorReport { exit, version }) => {
            let ev = match exit {
                ActorExit::Closed => Event::new(EventKind::WidgetClosed),
                ActorExit::Disconnected => {
                    Event::new(EventKind::WidgetClosed).with_reason("disconnected")
                }
                ActorExit::Retired => Event::new(EventKind::WidgetRetired).with_reason("idle"),
            };
            ev.with_version(version)
        }
        Err(panic_err) => {
            Event::new(EventKind::ActorTerminated).with_reason(panic_message(&*panic_err))
        }
    };
    bus.publish(event.with_widget(id));
}

fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Retention;
    use crate::models::{Counter, Markers};
    use crate::subscribers::Subscribe;
    use crate::widget::{Input, NotificationKind, Transition, Typed};
    use serde_json::json;
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;

    fn manager(cfg: Config) -> Arc<WidgetManager> {
        WidgetManager::builder(cfg).with_typed_model(Counter).build()
    }

    fn values(stream: &mut ObserverStream) -> Vec<(NotificationKind, Value)> {
        stream
            .drain()
            .iter()
            .map(|n| (n.kind, n.payload.clone()))
            .collect()
    }

    async fn wait_for(events: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
        loop {
            let ev = events.recv().await.unwrap();
            if ev.kind == kind {
                return ev;
            }
        }
    }

    /// Panics when asked to add 13.
    struct Unlucky;

    impl Model for Unlucky {
        fn kind(&self) -> &str {
            "unlucky"
        }

        fn init(&self, payload: &Value) -> Result<Value, WidgetError> {
            Ok(payload.clone())
        }

        fn apply(&self, state: &Value, input: Input<'_>) -> Result<Transition, WidgetError> {
            if let Input::Update(p) = input {
                if p == &json!(13) {
                    panic!("unlucky number");
                }
            }
            Ok(Transition {
                state: state.clone(),
                outputs: Vec::new(),
            })
        }
    }

    /// Blocks inside `apply` on `"wait"` until released.
    struct Gate {
        entered: Mutex<std_mpsc::Sender<()>>,
        release: Mutex<std_mpsc::Receiver<()>>,
    }

    impl Model for Gate {
        fn kind(&self) -> &str {
            "gate"
        }

        fn init(&self, payload: &Value) -> Result<Value, WidgetError> {
            Ok(payload.clone())
        }

        fn apply(&self, state: &Value, input: Input<'_>) -> Result<Transition, WidgetError> {
            if let Input::Update(p) = input {
                if p == &json!("wait") {
                    if let Ok(entered) = self.entered.lock() {
                        let _ = entered.send(());
                    }
                    if let Ok(release) = self.release.lock() {
                        let _ = release.recv();
                    }
                }
            }
            Ok(Transition {
                state: state.clone(),
                outputs: Vec::new(),
            })
        }
    }

    #[derive(Default)]
    struct Quiet;

    #[async_trait::async_trait]
    impl Subscribe for Quiet {
        async fn on_event(&self, _: &Event) {}
    }

    #[tokio::test]
    async fn counter_scenario() {
        let m = manager(Config::default());
        let w = m.create_widget("counter", json!(0)).await.unwrap();

        let (a, mut a_rx) = m.observer();
        let (b, mut b_rx) = m.observer();

        assert_eq!(m.join(w, a.clone()).await.unwrap().state, json!(0));
        m.update(w, json!({"add": 1})).await.unwrap();
        assert_eq!(m.join(w, b.clone()).await.unwrap().state, json!(1));
        m.update(w, json!({"add": 1})).await.unwrap();
        m.leave(w, a.id()).await.unwrap();
        m.update(w, json!({"add": 1})).await.unwrap();

        assert_eq!(
            values(&mut a_rx),
            vec![
                (NotificationKind::Snapshot, json!(0)),
                (NotificationKind::Event, json!(1)),
                (NotificationKind::Event, json!(2)),
            ]
        );
        assert_eq!(
            values(&mut b_rx),
            vec![
                (NotificationKind::Snapshot, json!(1)),
                (NotificationKind::Event, json!(2)),
                (NotificationKind::Event, json!(3)),
            ]
        );
        m.shutdown().await;
    }

    #[tokio::test]
    async fn join_unknown_widget_is_not_found() {
        let m = manager(Config::default());
        let (a, _a_rx) = m.observer();

        let err = m.join(WidgetId::from_raw(42), a).await.unwrap_err();
        assert_eq!(err, WidgetError::NotFound { widget: WidgetId::from_raw(42) });
        assert!(m.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_kind_and_bad_init_create_nothing() {
        let m = manager(Config::default());
        let mut events = m.events();

        let err = m.create_widget("gauge", json!(0)).await.unwrap_err();
        assert!(matches!(err, WidgetError::UnknownModel { .. }));

        let err = m.create_widget("counter", json!("zero")).await.unwrap_err();
        assert!(matches!(err, WidgetError::InvalidCommand { .. }));
        assert_eq!(events.recv().await.unwrap().kind, EventKind::CommandRejected);

        assert_eq!(m.len().await, 0);
        assert_eq!(m.model_kinds(), vec!["counter"]);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_later_commands_see_closed() {
        let m = manager(Config::default());
        let w = m.create_widget("counter", json!(0)).await.unwrap();
        let (a, mut a_rx) = m.observer();
        m.join(w, a.clone()).await.unwrap();

        m.close(w).await.unwrap();
        m.close(w).await.unwrap();

        assert!(!m.contains(w).await);
        assert!(m.list().await.is_empty());
        assert_eq!(
            m.update(w, json!({"add": 1})).await,
            Err(WidgetError::Closed { widget: w })
        );
        assert_eq!(
            m.join(w, a).await.unwrap_err(),
            WidgetError::Closed { widget: w }
        );

        // Only the join snapshot, then the stream ends with the widget.
        assert_eq!(a_rx.recv().await.map(|n| n.kind), Some(NotificationKind::Snapshot));
        assert!(a_rx.recv().await.is_none());

        assert_eq!(
            m.close(WidgetId::from_raw(99)).await,
            Err(WidgetError::NotFound { widget: WidgetId::from_raw(99) })
        );
    }

    #[tokio::test]
    async fn observer_events_broadcast_to_all_members() {
        let m = manager(Config::default());
        let w = m.create_widget("counter", json!(10)).await.unwrap();
        let (a, mut a_rx) = m.observer();
        let (b, mut b_rx) = m.observer();
        m.join(w, a.clone()).await.unwrap();
        m.join(w, b.clone()).await.unwrap();

        m.observer_event(w, a.id(), json!("decrement")).await.unwrap();
        assert_eq!(m.update(w, json!({"set": 0})).await, Ok(2));

        let expect = |snap: i64| {
            vec![
                (NotificationKind::Snapshot, json!(snap)),
                (NotificationKind::Event, json!(9)),
                (NotificationKind::Event, json!(0)),
            ]
        };
        assert_eq!(values(&mut a_rx), expect(10));
        assert_eq!(values(&mut b_rx), expect(10));
        m.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_join_sees_no_gap_and_no_duplicate() {
        let m = manager(Config {
            observer_capacity: 256,
            ..Config::default()
        });
        let w = m.create_widget("counter", json!(0)).await.unwrap();

        let writer = {
            let m = Arc::clone(&m);
            tokio::spawn(async move {
                for _ in 0..100 {
                    m.update(w, json!({"add": 1})).await.unwrap();
                }
            })
        };
        tokio::task::yield_now().await;

        let (a, mut a_rx) = m.observer();
        let snapshot = m.join(w, a).await.unwrap();
        writer.await.unwrap();

        let notes = a_rx.drain();
        assert!(notes[0].is_snapshot());
        assert_eq!(notes[0].seq, snapshot.seq);

        let mut expected = snapshot.seq;
        for n in &notes[1..] {
            expected += 1;
            assert_eq!(n.seq, expected);
            assert_eq!(n.payload, json!(expected));
        }
        assert_eq!(expected, 100);
        m.shutdown().await;
    }

    #[tokio::test]
    async fn full_state_matches_replayed_log() {
        let m = manager(Config::default());
        let log = vec![
            Command::Init(json!(5)),
            Command::Update(json!({"add": 3})),
            Command::Update(json!("bogus")),
            Command::Update(json!({"set": -2})),
            Command::Update(json!({"add": 7})),
        ];
        let w = m.create_widget("counter", json!(5)).await.unwrap();
        for cmd in &log[1..] {
            if let Command::Update(p) = cmd {
                let _ = m.update(w, p.clone()).await;
            }
        }

        let replayed = StateCell::replay(Arc::new(Typed::new(Counter)), &log).unwrap();
        let (a, _a_rx) = m.observer();
        let snap = m.join(w, a).await.unwrap();
        assert_eq!(&snap.state, replayed.value());
        assert_eq!(snap.version, replayed.version());
        m.shutdown().await;
    }

    #[tokio::test]
    async fn slow_observer_drops_without_blocking() {
        let m = manager(Config {
            observer_capacity: 1,
            ..Config::default()
        });
        let mut events = m.events();
        let w = m.create_widget("counter", json!(0)).await.unwrap();

        let (slow, mut slow_rx) = m.observer();
        let (fast, mut fast_rx) = ObserverHandle::channel(16);
        m.join(w, slow).await.unwrap();
        m.join(w, fast).await.unwrap();

        for _ in 0..3 {
            m.update(w, json!({"add": 1})).await.unwrap();
        }

        let dropped = wait_for(&mut events, EventKind::DeliveryDropped).await;
        assert_eq!(dropped.reason.as_deref(), Some("full"));
        assert_eq!(slow_rx.drain().len(), 1);
        assert_eq!(fast_rx.drain().len(), 4);

        // Still a member: capacity frees up and the next change arrives.
        m.update(w, json!({"add": 1})).await.unwrap();
        assert_eq!(slow_rx.drain().last().map(|n| n.payload.clone()), Some(json!(4)));
        m.shutdown().await;
    }

    #[tokio::test]
    async fn actor_panic_terminates_only_that_widget() {
        let m = manager(Config::default());
        let mut events = m.events();
        let bad = m.create_with(Arc::new(Unlucky), json!(null)).await.unwrap();
        let good = m.create_widget("counter", json!(0)).await.unwrap();

        assert_eq!(
            m.update(bad, json!(13)).await,
            Err(WidgetError::ActorTerminated { widget: bad })
        );
        let ev = wait_for(&mut events, EventKind::ActorTerminated).await;
        assert_eq!(ev.widget, Some(bad));
        assert_eq!(ev.reason.as_deref(), Some("unlucky number"));

        assert!(!m.contains(bad).await);
        assert_eq!(
            m.update(bad, json!(1)).await,
            Err(WidgetError::Closed { widget: bad })
        );
        assert_eq!(m.update(good, json!({"add": 1})).await, Ok(1));
        assert_eq!(m.list().await, vec![good]);
        m.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn idle_widgets_are_retired() {
        let m = manager(Config {
            retention: Retention::IdleFor(Duration::from_secs(10)),
            ..Config::default()
        });
        let mut events = m.events();
        let w = m.create_widget("counter", json!(0)).await.unwrap();

        let ev = wait_for(&mut events, EventKind::WidgetRetired).await;
        assert_eq!(ev.widget, Some(w));
        assert!(!m.contains(w).await);

        let (a, _a_rx) = m.observer();
        assert_eq!(m.join(w, a).await.unwrap_err(), WidgetError::Closed { widget: w });
    }

    #[tokio::test]
    async fn manual_retention_keeps_unobserved_widgets() {
        let m = manager(Config::default());
        let w = m.create_widget("counter", json!(0)).await.unwrap();
        let (a, _a_rx) = m.observer();
        m.join(w, a.clone()).await.unwrap();
        m.leave(w, a.id()).await.unwrap();

        assert_eq!(m.update(w, json!({"add": 2})).await, Ok(1));
        assert!(m.contains(w).await);
        m.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_closes_everything() {
        let m = manager(Config::default());
        let w1 = m.create_widget("counter", json!(0)).await.unwrap();
        let w2 = m.create_widget("counter", json!(0)).await.unwrap();
        assert_eq!(m.list().await, vec![w1, w2]);

        m.shutdown().await;
        assert!(m.is_empty().await);
        assert_eq!(
            m.update(w1, json!({"add": 1})).await,
            Err(WidgetError::Closed { widget: w1 })
        );
    }

    #[tokio::test]
    async fn replies_do_not_open_gaps_for_other_observers() {
        let m = WidgetManager::builder(Config::default())
            .with_typed_model(Markers)
            .build();
        let w = m.create_widget("markers", json!([])).await.unwrap();
        let (a, mut a_rx) = m.observer();
        let (b, mut b_rx) = m.observer();
        m.join(w, a).await.unwrap();
        m.join(w, b.clone()).await.unwrap();

        m.update(w, json!({"add": {"id": "hq", "lat": 52.5, "lon": 13.4}}))
            .await
            .unwrap();
        m.observer_event(w, b.id(), json!({"inspect": "hq"}))
            .await
            .unwrap();
        m.update(w, json!("clear")).await.unwrap();

        let stamps = |rx: &mut ObserverStream| -> Vec<(NotificationKind, u64)> {
            rx.drain().iter().map(|n| (n.kind, n.seq)).collect()
        };
        assert_eq!(
            stamps(&mut a_rx),
            vec![
                (NotificationKind::Snapshot, 0),
                (NotificationKind::Event, 1),
                (NotificationKind::Event, 2),
            ]
        );
        assert_eq!(
            stamps(&mut b_rx),
            vec![
                (NotificationKind::Snapshot, 0),
                (NotificationKind::Event, 1),
                (NotificationKind::Reply, 1),
                (NotificationKind::Event, 2),
            ]
        );

        let (c, _c_rx) = m.observer();
        let late = m.join(w, c).await.unwrap();
        assert_eq!(late.seq, 2);
        assert_eq!(late.version, 3);
        m.shutdown().await;
    }

    #[tokio::test]
    async fn join_without_room_for_snapshot_is_rejected() {
        let m = manager(Config {
            observer_capacity: 1,
            ..Config::default()
        });
        let w1 = m.create_widget("counter", json!(0)).await.unwrap();
        let w2 = m.create_widget("counter", json!(100)).await.unwrap();
        let (a, mut a_rx) = m.observer();
        m.join(w1, a.clone()).await.unwrap();

        let err = m.join(w2, a.clone()).await.unwrap_err();
        assert_eq!(err.as_label(), "observer_unreachable");

        m.send(w2, Command::Join(a.clone())).await.unwrap();
        m.update(w2, json!({"add": 1})).await.unwrap();

        let seen: Vec<_> = a_rx.drain().iter().map(|n| (n.widget, n.kind)).collect();
        assert_eq!(seen, vec![(w1, NotificationKind::Snapshot)]);

        m.update(w2, json!({"add": 1})).await.unwrap();
        assert!(a_rx.drain().is_empty());

        let snap = m.join(w2, a).await.unwrap();
        assert_eq!(snap.state, json!(102));
        assert_eq!(a_rx.drain().len(), 1);
        m.shutdown().await;
    }

    #[tokio::test]
    async fn one_observer_spans_widgets_independently() {
        let m = manager(Config::default());
        let w1 = m.create_widget("counter", json!(0)).await.unwrap();
        let w2 = m.create_widget("counter", json!(10)).await.unwrap();
        let (a, mut a_rx) = m.observer();
        m.join(w1, a.clone()).await.unwrap();
        m.join(w2, a.clone()).await.unwrap();

        m.leave(w1, a.id()).await.unwrap();
        m.update(w1, json!({"add": 1})).await.unwrap();
        m.update(w2, json!({"add": 1})).await.unwrap();

        m.close(w1).await.unwrap();
        m.update(w2, json!({"add": 1})).await.unwrap();

        let seen: Vec<_> = a_rx
            .drain()
            .iter()
            .map(|n| (n.widget, n.payload.clone()))
            .collect();
        assert_eq!(
            seen,
            vec![
                (w1, json!(0)),
                (w2, json!(10)),
                (w2, json!(11)),
                (w2, json!(12)),
            ]
        );
        m.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn full_queue_throttles_only_its_own_widget() {
        let (entered_tx, entered_rx) = std_mpsc::channel();
        let (release_tx, release_rx) = std_mpsc::channel();
        let gate = Arc::new(Gate {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        let m = manager(Config {
            command_capacity: 1,
            ..Config::default()
        });
        let busy = m.create_with(gate, json!(null)).await.unwrap();
        let free = m.create_widget("counter", json!(0)).await.unwrap();

        m.send(busy, Command::Update(json!("wait"))).await.unwrap();
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        m.send(busy, Command::Update(json!("queued"))).await.unwrap();

        let blocked = {
            let m = Arc::clone(&m);
            tokio::spawn(async move { m.send(busy, Command::Update(json!("waits"))).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());

        let update = m.update(free, json!({"add": 1}));
        let applied = tokio::time::timeout(Duration::from_secs(5), update)
            .await
            .unwrap();
        assert_eq!(applied, Ok(1));

        release_tx.send(()).unwrap();
        assert_eq!(blocked.await.unwrap(), Ok(()));
        m.shutdown().await;
    }

    #[tokio::test]
    async fn dropping_the_manager_stops_subscriber_workers() {
        let quiet = Arc::new(Quiet);
        let m = WidgetManager::builder(Config::default())
            .with_typed_model(Counter)
            .with_subscriber(quiet.clone())
            .build();
        m.create_widget("counter", json!(0)).await.unwrap();
        assert!(Arc::strong_count(&quiet) > 1);

        drop(m);
        tokio::time::timeout(Duration::from_secs(5), async {
            while Arc::strong_count(&quiet) > 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }
}

//! # LogWriter: runtime events as `tracing` records
//!
//! A subscriber that renders every [`Event`] through the `tracing` macros, one record
//! per event, with the event's metadata as structured fields. Install any
//! `tracing` subscriber in the host program to see them.
//!
//! | Kind                                   | Level  |
//! |----------------------------------------|--------|
//! | `UpdateApplied`                        | trace  |
//! | `ObserverJoined`, `ObserverLeft`       | debug  |
//! | `WidgetCreated`, `WidgetClosed`, `WidgetRetired` | info |
//! | `CommandRejected`, `DeliveryDropped`, `ObserverPruned`, `SubscriberOverflow` | warn |
//! | `ActorTerminated`, `SubscriberPanicked`| error  |

use async_trait::async_trait;
use tracing::{debug, error, info, trace, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Runtime-event logger.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let widget = e.widget.map(|w| w.to_string());
        let widget = widget.as_deref().unwrap_or("-");
        let observer = e.observer.map(|o| o.to_string());
        let observer = observer.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::UpdateApplied => trace!(
                seq = e.seq,
                widget,
                observer,
                command = e.command.unwrap_or("-"),
                version = e.version,
                recipients = e.recipients,
                "update applied"
            ),
            EventKind::ObserverJoined => {
                debug!(seq = e.seq, widget, observer, version = e.version, "observer joined")
            }
            EventKind::ObserverLeft => debug!(seq = e.seq, widget, observer, "observer left"),
            EventKind::WidgetCreated => info!(
                seq = e.seq,
                widget,
                model = e.model.as_deref().unwrap_or("-"),
                "widget created"
            ),
            EventKind::WidgetClosed => {
                info!(seq = e.seq, widget, version = e.version, reason, "widget closed")
            }
            EventKind::WidgetRetired => {
                info!(seq = e.seq, widget, version = e.version, reason, "widget retired")
            }
            EventKind::CommandRejected => warn!(
                seq = e.seq,
                widget,
                observer,
                command = e.command.unwrap_or("-"),
                reason,
                "command rejected"
            ),
            EventKind::DeliveryDropped => warn!(
                seq = e.seq,
                widget,
                observer,
                version = e.version,
                reason,
                "notification dropped"
            ),
            EventKind::ObserverPruned => warn!(seq = e.seq, widget, observer, "observer pruned"),
            EventKind::SubscriberOverflow => warn!(
                seq = e.seq,
                subscriber = e.subscriber.unwrap_or("-"),
                reason,
                "subscriber overflow"
            ),
            EventKind::ActorTerminated => error!(seq = e.seq, widget, reason, "actor terminated"),
            EventKind::SubscriberPanicked => error!(
                seq = e.seq,
                subscriber = e.subscriber.unwrap_or("-"),
                reason,
                "subscriber panicked"
            ),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::{ObserverId, WidgetId};
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn every_kind_is_logged_at_its_level() {
        let out = Capture::default();
        let make = {
            let out = out.clone();
            move || out.clone()
        };
        let subscriber = tracing_subscriber::fmt()
            .with_writer(make)
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();

        let cases = [
            (EventKind::UpdateApplied, "TRACE", "update applied"),
            (EventKind::ObserverJoined, "DEBUG", "observer joined"),
            (EventKind::ObserverLeft, "DEBUG", "observer left"),
            (EventKind::WidgetCreated, "INFO", "widget created"),
            (EventKind::WidgetClosed, "INFO", "widget closed"),
            (EventKind::WidgetRetired, "INFO", "widget retired"),
            (EventKind::CommandRejected, "WARN", "command rejected"),
            (EventKind::DeliveryDropped, "WARN", "notification dropped"),
            (EventKind::ObserverPruned, "WARN", "observer pruned"),
            (EventKind::SubscriberOverflow, "WARN", "subscriber overflow"),
            (EventKind::ActorTerminated, "ERROR", "actor terminated"),
            (EventKind::SubscriberPanicked, "ERROR", "subscriber panicked"),
        ];

        let writer = LogWriter::new();
        tracing::subscriber::with_default(subscriber, || {
            for (kind, _, _) in cases {
                let ev = Event::new(kind)
                    .with_widget(WidgetId::from_raw(4))
                    .with_observer(ObserverId::from_raw(2))
                    .with_version(7)
                    .with_reason("why");
                futures::executor::block_on(writer.on_event(&ev));
            }
        });

        let text = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), cases.len());
        for ((_, level, message), line) in cases.iter().zip(&lines) {
            assert!(line.contains(level), "{line}");
            assert!(line.contains(message), "{line}");
        }
        assert!(lines[3].contains("w-4"));
        assert!(lines[1].contains("o-2"));
    }
}

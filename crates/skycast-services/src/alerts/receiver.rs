use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use skycast_core::SchedulerError;
use skycast_store::AlertKind;

use super::alarm::{AlarmEvent, ScheduledAlarm};

/// Surfaces fired alerts to the user.
pub trait AlertPresenter: Send + Sync {
    fn show_notification(&self, alarm: &ScheduledAlarm);
    /// Start a looping sound for `alert_id`.
    fn start_sound(&self, alert_id: &str);
    fn stop_sound(&self, alert_id: &str);
}

/// Presenter that only writes log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPresenter;

impl AlertPresenter for LogPresenter {
    fn show_notification(&self, alarm: &ScheduledAlarm) {
        info!(
            alert_id = %alarm.alert_id,
            kind = %alarm.kind,
            trigger_time = %alarm.trigger_time,
            "Weather alert"
        );
    }

    fn start_sound(&self, alert_id: &str) {
        info!(alert_id, "Alarm sound started");
    }

    fn stop_sound(&self, alert_id: &str) {
        info!(alert_id, "Alarm sound stopped");
    }
}

/// Sender side for user actions on a fired alert.
#[derive(Debug, Clone)]
pub struct AlertActions {
    events: mpsc::UnboundedSender<AlarmEvent>,
}

impl AlertActions {
    pub fn new(events: mpsc::UnboundedSender<AlarmEvent>) -> Self {
        Self { events }
    }

    /// Ask the receiver to silence the alarm for `alert_id`.
    pub fn stop_sound(&self, alert_id: &str) -> Result<(), SchedulerError> {
        self.events
            .send(AlarmEvent::StopSound {
                alert_id: alert_id.to_string(),
            })
            .map_err(|_| SchedulerError::ShutDown)
    }
}

/// Consumes [`AlarmEvent`]s and drives the presenter.
pub struct AlertReceiver {
    events: mpsc::UnboundedReceiver<AlarmEvent>,
    presenter: Arc<dyn AlertPresenter>,
    sounding: HashSet<String>,
}

impl AlertReceiver {
    pub fn new(
        events: mpsc::UnboundedReceiver<AlarmEvent>,
        presenter: Arc<dyn AlertPresenter>,
    ) -> Self {
        Self {
            events,
            presenter,
            sounding: HashSet::new(),
        }
    }

    /// Handle one event.
    pub fn handle(&mut self, event: AlarmEvent) {
        match event {
            AlarmEvent::Fired(alarm) => {
                self.presenter.show_notification(&alarm);
                if alarm.kind == AlertKind::Alarm && self.sounding.insert(alarm.alert_id.clone()) {
                    self.presenter.start_sound(&alarm.alert_id);
                }
            }
            AlarmEvent::StopSound { alert_id } => {
                if self.sounding.remove(&alert_id) {
                    self.presenter.stop_sound(&alert_id);
                } else {
                    debug!("No sound playing for {}", alert_id);
                }
            }
        }
    }

    /// Alert ids whose sound is currently playing.
    pub fn sounding(&self) -> impl Iterator<Item = &str> {
        self.sounding.iter().map(String::as_str)
    }

    /// Process events until every sender is gone or `shutdown` is cancelled.
    /// Sounds still playing are stopped on the way out.
    pub async fn run(mut self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = self.events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
            }
        }

        for alert_id in self.sounding.drain() {
            self.presenter.stop_sound(&alert_id);
        }
        debug!("Alert receiver stopped");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::Utc;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingPresenter {
        calls: Mutex<Vec<String>>,
    }

    impl AlertPresenter for RecordingPresenter {
        fn show_notification(&self, alarm: &ScheduledAlarm) {
            self.calls.lock().push(format!("notify:{}", alarm.alert_id));
        }

        fn start_sound(&self, alert_id: &str) {
            self.calls.lock().push(format!("start:{alert_id}"));
        }

        fn stop_sound(&self, alert_id: &str) {
            self.calls.lock().push(format!("stop:{alert_id}"));
        }
    }

    fn fired(id: &str, kind: AlertKind) -> AlarmEvent {
        AlarmEvent::Fired(ScheduledAlarm {
            alert_id: id.to_string(),
            kind,
            trigger_time: Utc::now(),
        })
    }

    #[test]
    fn test_notification_kind_is_silent() {
        let presenter = Arc::new(RecordingPresenter::default());
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut receiver = AlertReceiver::new(rx, presenter.clone());

        receiver.handle(fired("n1", AlertKind::Notification));

        assert_eq!(*presenter.calls.lock(), vec!["notify:n1"]);
        assert_eq!(receiver.sounding().count(), 0);
    }

    #[test]
    fn test_alarm_kind_sounds_until_stopped() {
        let presenter = Arc::new(RecordingPresenter::default());
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut receiver = AlertReceiver::new(rx, presenter.clone());

        receiver.handle(fired("a1", AlertKind::Alarm));
        assert_eq!(receiver.sounding().collect::<Vec<_>>(), vec!["a1"]);

        receiver.handle(AlarmEvent::StopSound {
            alert_id: "a1".to_string(),
        });
        receiver.handle(AlarmEvent::StopSound {
            alert_id: "a1".to_string(),
        });

        assert_eq!(
            *presenter.calls.lock(),
            vec!["notify:a1", "start:a1", "stop:a1"]
        );
    }

    #[tokio::test]
    async fn test_run_consumes_actions_and_stops_on_close() {
        let presenter = Arc::new(RecordingPresenter::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let actions = AlertActions::new(tx.clone());
        let receiver = AlertReceiver::new(rx, presenter.clone());

        tx.send(fired("a2", AlertKind::Alarm)).unwrap();
        actions.stop_sound("a2").unwrap();
        tx.send(fired("a3", AlertKind::Alarm)).unwrap();
        drop(tx);
        drop(actions);

        receiver.run(CancellationToken::new()).await;

        assert_eq!(
            *presenter.calls.lock(),
            vec!["notify:a2", "start:a2", "stop:a2", "notify:a3", "start:a3", "stop:a3"]
        );
    }

    #[test]
    fn test_stop_sound_after_receiver_gone() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let actions = AlertActions::new(tx);
        assert!(matches!(actions.stop_sound("x"), Err(SchedulerError::ShutDown)));
    }
}

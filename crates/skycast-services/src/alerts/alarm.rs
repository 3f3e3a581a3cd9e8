use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use skycast_core::SchedulerError;
use skycast_store::{AlertKind, WeatherAlert};

/// What a timer carries until it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledAlarm {
    pub alert_id: String,
    pub kind: AlertKind,
    pub trigger_time: DateTime<Utc>,
}

impl From<&WeatherAlert> for ScheduledAlarm {
    fn from(alert: &WeatherAlert) -> Self {
        Self {
            alert_id: alert.id.clone(),
            kind: alert.kind,
            trigger_time: alert.trigger_time,
        }
    }
}

/// Messages delivered to the alert receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmEvent {
    /// A timer reached its trigger time.
    Fired(ScheduledAlarm),
    /// The user dismissed a sounding alarm.
    StopSound { alert_id: String },
}

/// Platform timer registration.
///
/// Registrations are keyed by an `i32`; scheduling a key that is already
/// registered replaces the earlier timer.
pub trait AlarmService: Send + Sync {
    fn schedule(&self, key: i32, alarm: ScheduledAlarm) -> Result<(), SchedulerError>;
    fn cancel(&self, key: i32);
}

/// Timer key for an alert id.
///
/// 31-multiplier hash over the UTF-16 code units with wrapping arithmetic, so
/// the same id maps to the same key in every process.
pub fn alarm_key(id: &str) -> i32 {
    id.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

struct Timer {
    generation: u64,
    token: CancellationToken,
}

/// [`AlarmService`] backed by tokio timers.
pub struct TokioAlarmService {
    handle: Handle,
    events: mpsc::UnboundedSender<AlarmEvent>,
    timers: Arc<Mutex<HashMap<i32, Timer>>>,
    generation: AtomicU64,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for TokioAlarmService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioAlarmService")
            .field("pending", &self.pending())
            .finish()
    }
}

impl TokioAlarmService {
    /// Timers run on `handle` and stop when `shutdown` is cancelled.
    pub fn new(
        handle: Handle,
        events: mpsc::UnboundedSender<AlarmEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            handle,
            events,
            timers: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            shutdown,
        }
    }

    /// Number of registered timers that have not fired yet.
    pub fn pending(&self) -> usize {
        self.timers.lock().len()
    }

    pub fn cancel_all(&self) {
        let mut timers = self.timers.lock();
        for (_, timer) in timers.drain() {
            timer.token.cancel();
        }
    }
}

impl AlarmService for TokioAlarmService {
    fn schedule(&self, key: i32, alarm: ScheduledAlarm) -> Result<(), SchedulerError> {
        if self.shutdown.is_cancelled() || self.events.is_closed() {
            return Err(SchedulerError::ShutDown);
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let token = self.shutdown.child_token();
        if let Some(previous) = self.timers.lock().insert(
            key,
            Timer {
                generation,
                token: token.clone(),
            },
        ) {
            previous.token.cancel();
            debug!("Replaced timer {}", key);
        }

        // A trigger time already in the past fires right away
        let delay = (alarm.trigger_time - Utc::now())
            .to_std()
            .unwrap_or_default();
        let timers = self.timers.clone();
        let events = self.events.clone();

        self.handle.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("Timer {} cancelled", key);
                }
                _ = tokio::time::sleep(delay) => {
                    {
                        let mut timers = timers.lock();
                        if timers.get(&key).is_some_and(|t| t.generation == generation) {
                            timers.remove(&key);
                        }
                    }
                    info!("Alert {} fired ({})", alarm.alert_id, alarm.kind);
                    let _ = events.send(AlarmEvent::Fired(alarm));
                }
            }
        });

        Ok(())
    }

    fn cancel(&self, key: i32) {
        if let Some(timer) = self.timers.lock().remove(&key) {
            timer.token.cancel();
            debug!("Cancelled timer {}", key);
        }
    }
}

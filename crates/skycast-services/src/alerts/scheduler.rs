use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use skycast_core::{AppError, ValidationError};
use skycast_store::{AlertKind, WeatherAlert};

use super::alarm::{alarm_key, AlarmService, ScheduledAlarm};
use crate::repository::WeatherAlertsRepository;

/// Creates, disables and re-arms weather alerts.
///
/// Persisting an alert and registering its timer are two separate steps; if
/// registration fails after the insert the record stays and the error is
/// returned.
pub struct AlertScheduler {
    repository: WeatherAlertsRepository,
    alarms: Arc<dyn AlarmService>,
    state: Arc<watch::Sender<Vec<WeatherAlert>>>,
}

impl AlertScheduler {
    pub fn new(repository: WeatherAlertsRepository, alarms: Arc<dyn AlarmService>) -> Self {
        let (state, _) = watch::channel(Vec::new());
        Self {
            repository,
            alarms,
            state: Arc::new(state),
        }
    }

    /// Latest alert list seen by the sync task.
    pub fn subscribe(&self) -> watch::Receiver<Vec<WeatherAlert>> {
        self.state.subscribe()
    }

    pub fn alerts(&self) -> Vec<WeatherAlert> {
        self.state.borrow().clone()
    }

    /// Task that mirrors the stored alert list into [`AlertScheduler::subscribe`]
    /// until `shutdown` is cancelled.
    pub fn sync_task(&self, shutdown: CancellationToken) -> impl Future<Output = ()> + Send + 'static {
        let mut alerts = self.repository.get_all();
        let state = self.state.clone();

        async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    next = alerts.next() => match next {
                        Some(Ok(list)) => {
                            debug!("Alert list now has {} entries", list.len());
                            state.send_replace(list);
                        }
                        Some(Err(e)) => warn!("Failed to load alerts: {}", e),
                        None => break,
                    },
                }
            }
            debug!("Alert sync stopped");
        }
    }

    /// Spawn [`AlertScheduler::sync_task`] on the current runtime.
    pub fn start(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.sync_task(shutdown))
    }

    /// Save a new active alert and arm its timer.
    ///
    /// The trigger time is stored at millisecond precision; the truncated value
    /// must be strictly in the future or nothing is stored or scheduled.
    pub async fn add(&self, trigger_time: DateTime<Utc>, kind: AlertKind) -> Result<WeatherAlert, AppError> {
        let trigger_time = trigger_time.trunc_subsecs(3);
        let now = Utc::now();
        if trigger_time <= now {
            return Err(ValidationError::TriggerTimeNotInFuture {
                trigger_millis: trigger_time.timestamp_millis(),
                now_millis: now.timestamp_millis(),
            }
            .into());
        }

        let alert = WeatherAlert::new(trigger_time, kind);
        self.repository.add(alert.clone()).await?;
        self.alarms
            .schedule(alarm_key(&alert.id), ScheduledAlarm::from(&alert))?;

        info!("Scheduled {} alert {} for {}", alert.kind, alert.id, alert.trigger_time);
        Ok(alert)
    }

    /// Turn an alert off and cancel its timer.
    ///
    /// Returns `Ok(false)` without side effects when the alert does not exist
    /// or is already inactive. Of several concurrent calls for one alert,
    /// exactly one returns `Ok(true)` and cancels the timer.
    pub async fn disable(&self, id: &str) -> Result<bool, AppError> {
        if !self.repository.deactivate(id).await? {
            debug!("Alert {} missing or already inactive; nothing to disable", id);
            return Ok(false);
        }

        self.alarms.cancel(alarm_key(id));
        info!("Disabled alert {}", id);
        Ok(true)
    }

    /// Re-arm timers for active alerts that have not fired yet.
    ///
    /// Timers do not survive a restart; call this once at startup.
    pub async fn reschedule_active(&self) -> Result<usize, AppError> {
        let now = Utc::now();
        let mut armed = 0;
        for alert in self.repository.get_active().await? {
            if alert.trigger_time <= now {
                continue;
            }
            self.alarms
                .schedule(alarm_key(&alert.id), ScheduledAlarm::from(&alert))?;
            armed += 1;
        }
        info!("Re-armed {} alert timers", armed);
        Ok(armed)
    }
}

//! Alert scheduling.
//!
//! [`AlertScheduler`] validates and persists alerts and registers a timer per
//! alert with an [`AlarmService`]. When a timer fires the service sends an
//! [`AlarmEvent`] over a channel; [`AlertReceiver`] consumes those events and
//! drives an [`AlertPresenter`].

mod alarm;
mod receiver;
mod scheduler;

pub use alarm::{alarm_key, AlarmEvent, AlarmService, ScheduledAlarm, TokioAlarmService};
pub use receiver::{AlertActions, AlertPresenter, AlertReceiver, LogPresenter};
pub use scheduler::AlertScheduler;

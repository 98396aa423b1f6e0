//! Alarms and reminders
//!
//! The dispatcher adds entries, the timer loop takes whatever is due and
//! announces it. Each entry fires at most once.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local, TimeDelta};

use crate::voice::Speaker;

/// Spoken when an alarm goes off
pub const ALARM_ANNOUNCEMENT: &str = "Сработал будильник.";

/// Payload used when a reminder was set without a phrase
pub const DEFAULT_REMINDER: &str = "Напоминание";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub due: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub due: DateTime<Local>,
    pub text: String,
}

/// An entry taken off the schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fired {
    Alarm(Alarm),
    Reminder(Reminder),
}

impl Fired {
    /// What to say for this entry
    #[must_use]
    pub fn announcement(&self) -> &str {
        match self {
            Self::Alarm(_) => ALARM_ANNOUNCEMENT,
            Self::Reminder(r) => &r.text,
        }
    }

    #[must_use]
    pub fn due(&self) -> DateTime<Local> {
        match self {
            Self::Alarm(a) => a.due,
            Self::Reminder(r) => r.due,
        }
    }
}

/// Pending alarms and reminders, in insertion order
#[derive(Debug, Default)]
pub struct Timers {
    alarms: Vec<Alarm>,
    reminders: Vec<Reminder>,
}

impl Timers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an alarm `minutes` after `now`, returning its due time
    pub fn add_alarm(&mut self, now: DateTime<Local>, minutes: u32) -> DateTime<Local> {
        let due = now + TimeDelta::minutes(i64::from(minutes));
        self.alarms.push(Alarm { due });
        due
    }

    /// Schedule a reminder `minutes` after `now`, returning its due time
    ///
    /// A blank `text` is replaced by [`DEFAULT_REMINDER`].
    pub fn add_reminder(
        &mut self,
        now: DateTime<Local>,
        minutes: u32,
        text: impl Into<String>,
    ) -> DateTime<Local> {
        let due = now + TimeDelta::minutes(i64::from(minutes));
        let text = text.into();
        let text = if text.trim().is_empty() {
            DEFAULT_REMINDER.to_string()
        } else {
            text
        };
        self.reminders.push(Reminder { due, text });
        due
    }

    /// Remove and return every entry due at or before `now`
    ///
    /// Alarms come first, each group in insertion order.
    pub fn take_due(&mut self, now: DateTime<Local>) -> Vec<Fired> {
        let (due_alarms, alarms): (Vec<_>, Vec<_>) = std::mem::take(&mut self.alarms)
            .into_iter()
            .partition(|a| a.due <= now);
        let (due_reminders, reminders): (Vec<_>, Vec<_>) = std::mem::take(&mut self.reminders)
            .into_iter()
            .partition(|r| r.due <= now);
        self.alarms = alarms;
        self.reminders = reminders;

        due_alarms
            .into_iter()
            .map(Fired::Alarm)
            .chain(due_reminders.into_iter().map(Fired::Reminder))
            .collect()
    }

    #[must_use]
    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    #[must_use]
    pub fn reminders(&self) -> &[Reminder] {
        &self.reminders
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty() && self.reminders.is_empty()
    }
}

/// [`Timers`] shared between the dispatcher and the timer loop
#[derive(Debug, Clone, Default)]
pub struct SharedTimers {
    inner: Arc<Mutex<Timers>>,
}

impl SharedTimers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the schedule
    ///
    /// A panic while holding the lock leaves plain data behind, so a
    /// poisoned lock is used as is.
    pub fn lock(&self) -> MutexGuard<'_, Timers> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_alarm(&self, now: DateTime<Local>, minutes: u32) -> DateTime<Local> {
        self.lock().add_alarm(now, minutes)
    }

    pub fn add_reminder(
        &self,
        now: DateTime<Local>,
        minutes: u32,
        text: impl Into<String>,
    ) -> DateTime<Local> {
        self.lock().add_reminder(now, minutes, text)
    }

    pub fn take_due(&self, now: DateTime<Local>) -> Vec<Fired> {
        self.lock().take_due(now)
    }
}

/// Announce everything due at `now`, returning how many entries fired
///
/// Entries leave the schedule before they are spoken, so a failed
/// announcement is logged and not retried.
pub async fn fire_due(timers: &SharedTimers, speaker: &dyn Speaker, now: DateTime<Local>) -> usize {
    let fired = timers.take_due(now);
    for entry in &fired {
        tracing::info!(due = %entry.due(), text = entry.announcement(), "timer fired");
        if let Err(e) = speaker.say(entry.announcement()).await {
            tracing::warn!(error = %e, "failed to announce timer");
        }
    }
    fired.len()
}

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Session;
use crate::reminder::ReminderHandle;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Active,
}

/// The single current-session slot.
///
/// Elapsed time is never accumulated: it is always recomputed from the wall
/// clock against `start_time`, so a suspended process picks up the correct
/// value on resume instead of drifting by its missed ticks.
#[derive(Debug, Default)]
pub struct TimerState {
    pub status: TimerStatus,
    /// The active session. `end_time` stays unset and `duration` stays zero
    /// until [`TimerState::finish`] seals it.
    pub session: Option<Session>,
    /// Handle of the pending goal reminder, if one was scheduled.
    pub reminder: Option<ReminderHandle>,
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole seconds since the active session started, floored; zero when
    /// idle or if the clock reads before the start.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        match &self.session {
            Some(session) => (now - session.start_time).num_seconds().max(0) as u64,
            None => 0,
        }
    }

    /// Whether elapsed time has reached the goal. The session keeps running
    /// regardless; only an explicit end terminates it.
    pub fn goal_reached(&self, now: DateTime<Utc>) -> bool {
        match &self.session {
            Some(session) => self.elapsed_secs(now) >= session.goal_secs(),
            None => false,
        }
    }

    pub fn begin(&mut self, session: Session, reminder: Option<ReminderHandle>) {
        self.status = TimerStatus::Active;
        self.session = Some(session);
        self.reminder = reminder;
    }

    /// Seals the active session with the caller-asserted outcome and resets
    /// to idle. Returns the finished session and any pending reminder
    /// handle; `None` when already idle.
    pub fn finish(
        &mut self,
        now: DateTime<Utc>,
        completed: bool,
    ) -> Option<(Session, Option<ReminderHandle>)> {
        let elapsed = self.elapsed_secs(now);
        let mut session = self.session.take()?;
        let reminder = self.reminder.take();

        session.end_time = Some(now);
        session.duration = elapsed;
        session.completed = completed;

        self.status = TimerStatus::Idle;
        Some((session, reminder))
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> TimerSnapshot {
        TimerSnapshot {
            status: self.status,
            session: self.session.clone(),
            elapsed_secs: self.elapsed_secs(now),
            goal_reached: self.goal_reached(now),
        }
    }
}

/// Point-in-time view published to observers on every tick.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub status: TimerStatus,
    pub session: Option<Session>,
    pub elapsed_secs: u64,
    pub goal_reached: bool,
}

impl TimerSnapshot {
    pub fn idle() -> Self {
        Self {
            status: TimerStatus::Idle,
            session: None,
            elapsed_secs: 0,
            goal_reached: false,
        }
    }
}

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// One timed focus interval, from start to an explicit end.
///
/// A session is *active* while `end_time` is `None`; active sessions exist
/// only in the controller's transient state and are never persisted. Once
/// finished, all fields are set and the record is immutable.
///
/// Timestamps serialize as milliseconds since the epoch, matching the
/// store's on-disk list format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub task_name: String,
    /// Goal length in minutes. Reaching it does not auto-end the session.
    pub goal_duration: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_time: Option<DateTime<Utc>>,
    /// Actual duration in whole seconds, set once at finish.
    pub duration: u64,
    /// Caller-asserted outcome: true if the goal was met, false if the
    /// session was cancelled early.
    pub completed: bool,
}

impl Session {
    pub fn goal_secs(&self) -> u64 {
        u64::from(self.goal_duration) * 60
    }

    /// Local calendar date of the session start, `YYYY-MM-DD`.
    pub fn local_date_key(&self) -> String {
        self.start_time
            .with_timezone(&Local)
            .format("%Y-%m-%d")
            .to_string()
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Rolling-window aggregates over the full session history. Derived on
/// demand, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Seconds since local midnight of the reference time.
    pub today_total: u64,
    /// Seconds within the last 7 days (rolling, not calendar week).
    pub week_total: u64,
    /// Seconds within the last 30 days (rolling, not calendar month).
    pub month_total: u64,
    pub all_time_total: u64,
    pub total_sessions: usize,
    pub completed_sessions: usize,
    pub cancelled_sessions: usize,
}

/// Per-calendar-day bucket of sessions. Only days with at least one session
/// get a bucket; gaps are never zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    /// Local date key, `YYYY-MM-DD`.
    pub date: String,
    /// Sum of this day's session durations, seconds.
    pub total_duration: u64,
    /// This day's sessions, most recent start first.
    pub sessions: Vec<Session>,
}

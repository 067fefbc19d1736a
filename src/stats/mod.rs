//! Pure aggregation over the finished-session history.
//!
//! Everything here is a function of its inputs: the aggregates are
//! recomputed fresh on every call and nothing is cached or persisted.
//! `calculate_stats` uses rolling windows (last 7/30 days from the call
//! time), not calendar weeks or months.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone};

use crate::models::{DailyStats, Session, SessionStats};

/// Rolling-window totals and outcome counts, relative to `Local::now()`.
pub fn calculate_stats(sessions: &[Session]) -> SessionStats {
    calculate_stats_at(sessions, Local::now())
}

/// Same as [`calculate_stats`] with an explicit reference time.
///
/// The windows are additive and independent: a session from today counts in
/// the today, week and month totals alike.
pub fn calculate_stats_at(sessions: &[Session], now: DateTime<Local>) -> SessionStats {
    let today_start = local_midnight(now).with_timezone(&chrono::Utc);
    let week_ago = (now - Duration::days(7)).with_timezone(&chrono::Utc);
    let month_ago = (now - Duration::days(30)).with_timezone(&chrono::Utc);

    let mut stats = SessionStats::default();

    for session in sessions {
        stats.all_time_total += session.duration;
        stats.total_sessions += 1;

        if session.completed {
            stats.completed_sessions += 1;
        } else {
            stats.cancelled_sessions += 1;
        }

        if session.start_time >= today_start {
            stats.today_total += session.duration;
        }
        if session.start_time >= week_ago {
            stats.week_total += session.duration;
        }
        if session.start_time >= month_ago {
            stats.month_total += session.duration;
        }
    }

    stats
}

/// Partitions sessions into per-local-calendar-day buckets, most recent day
/// first, sessions within a day most recent start first.
///
/// Input order is irrelevant; buckets are always re-sorted internally. Days
/// without sessions produce no bucket.
pub fn group_sessions_by_day(sessions: &[Session]) -> Vec<DailyStats> {
    let mut grouped: BTreeMap<String, Vec<Session>> = BTreeMap::new();

    for session in sessions {
        grouped
            .entry(session.local_date_key())
            .or_default()
            .push(session.clone());
    }

    grouped
        .into_iter()
        .rev()
        .map(|(date, mut day_sessions)| {
            day_sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
            let total_duration = day_sessions.iter().map(|s| s.duration).sum();
            DailyStats {
                date,
                total_duration,
                sessions: day_sessions,
            }
        })
        .collect()
}

/// `H:MM:SS`, hours omitted when zero: `90` -> `"1:30"`, `3661` -> `"1:01:01"`.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Compact human form: `"2h 15m"`, `"2h"`, `"15m"`, `"< 1m"`.
pub fn format_duration_human(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;

    match (hours, minutes) {
        (0, 0) => "< 1m".to_string(),
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// Local midnight of the day containing `now`.
///
/// A DST gap can make midnight nonexistent; fall back to the earliest valid
/// instant of the day in that case.
fn local_midnight(now: DateTime<Local>) -> DateTime<Local> {
    match Local.from_local_datetime(&now.date_naive().and_time(NaiveTime::MIN)) {
        chrono::LocalResult::Single(start) => start,
        chrono::LocalResult::Ambiguous(earliest, _) => earliest,
        chrono::LocalResult::None => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn session_at(start: DateTime<Local>, duration: u64, completed: bool) -> Session {
        Session {
            id: uuid::Uuid::new_v4().to_string(),
            task_name: "deep work".into(),
            goal_duration: 25,
            start_time: start.with_timezone(&Utc),
            end_time: Some(start.with_timezone(&Utc) + Duration::seconds(duration as i64)),
            duration,
            completed,
        }
    }

    fn today_at(now: DateTime<Local>, hour: u32, minute: u32) -> DateTime<Local> {
        Local
            .from_local_datetime(
                &now.date_naive()
                    .and_time(NaiveTime::from_hms_opt(hour, minute, 0).unwrap()),
            )
            .single()
            .unwrap()
    }

    #[test]
    fn empty_history_yields_zero_stats() {
        let stats = calculate_stats(&[]);
        assert_eq!(stats, SessionStats::default());
        assert!(group_sessions_by_day(&[]).is_empty());
    }

    #[test]
    fn two_session_day_scenario() {
        // Noon reference so 09:00/10:00 sessions are unambiguously "today".
        let now = today_at(Local::now(), 12, 0);
        let sessions = vec![
            session_at(today_at(now, 9, 0), 1500, true),
            session_at(today_at(now, 10, 0), 300, false),
        ];

        let stats = calculate_stats_at(&sessions, now);
        assert_eq!(stats.today_total, 1800);
        assert_eq!(stats.week_total, 1800);
        assert_eq!(stats.month_total, 1800);
        assert_eq!(stats.all_time_total, 1800);
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.completed_sessions, 1);
        assert_eq!(stats.cancelled_sessions, 1);

        let daily = group_sessions_by_day(&sessions);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].total_duration, 1800);
        assert_eq!(daily[0].sessions[0].duration, 300); // 10:00 first
        assert_eq!(daily[0].sessions[1].duration, 1500);
    }

    #[test]
    fn rolling_windows_are_additive_not_exclusive() {
        let now = today_at(Local::now(), 12, 0);
        let sessions = vec![
            session_at(now - Duration::hours(1), 100, true), // today + week + month
            session_at(now - Duration::days(3), 200, true),  // week + month
            session_at(now - Duration::days(14), 400, true), // month only
            session_at(now - Duration::days(90), 800, true), // all-time only
        ];

        let stats = calculate_stats_at(&sessions, now);
        assert_eq!(stats.today_total, 100);
        assert_eq!(stats.week_total, 300);
        assert_eq!(stats.month_total, 700);
        assert_eq!(stats.all_time_total, 1500);
    }

    #[test]
    fn completed_plus_cancelled_equals_total() {
        let now = Local::now();
        let sessions: Vec<Session> = (0..7)
            .map(|i| session_at(now - Duration::days(i), 60, i % 3 == 0))
            .collect();

        let stats = calculate_stats_at(&sessions, now);
        assert_eq!(
            stats.completed_sessions + stats.cancelled_sessions,
            stats.total_sessions
        );
    }

    #[test]
    fn aggregation_is_order_independent() {
        let now = today_at(Local::now(), 12, 0);
        let mut sessions = vec![
            session_at(now - Duration::days(2), 120, true),
            session_at(now - Duration::hours(2), 240, false),
            session_at(now - Duration::days(2) + Duration::hours(1), 60, true),
        ];

        let forward_stats = calculate_stats_at(&sessions, now);
        let forward_daily = group_sessions_by_day(&sessions);

        sessions.reverse();
        assert_eq!(calculate_stats_at(&sessions, now), forward_stats);
        assert_eq!(group_sessions_by_day(&sessions), forward_daily);
    }

    #[test]
    fn day_buckets_follow_calendar_dates_not_24h_windows() {
        let now = today_at(Local::now(), 12, 0);
        let late = today_at(now, 23, 30) - Duration::days(1);
        let early = today_at(now, 0, 30);
        // Less than 24h apart in absolute time, different calendar dates.
        let sessions = vec![session_at(late, 600, true), session_at(early, 300, true)];

        let daily = group_sessions_by_day(&sessions);
        assert_eq!(daily.len(), 2);
        // Most recent day first.
        assert_eq!(daily[0].total_duration, 300);
        assert_eq!(daily[1].total_duration, 600);
        assert!(daily[0].date > daily[1].date);
    }

    #[test]
    fn format_duration_cases() {
        assert_eq!(format_duration(90), "1:30");
        assert_eq!(format_duration(3661), "1:01:01");
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(3600), "1:00:00");
    }

    #[test]
    fn format_duration_human_cases() {
        assert_eq!(format_duration_human(0), "< 1m");
        assert_eq!(format_duration_human(59), "< 1m");
        assert_eq!(format_duration_human(65), "1m");
        assert_eq!(format_duration_human(3600), "1h");
        assert_eq!(format_duration_human(3660), "1h 1m");
        assert_eq!(format_duration_human(8100), "2h 15m");
    }
}

//! Focus-timer session engine.
//!
//! A session names a task and a goal duration; the [`SessionController`]
//! runs it (start, 1-second ticks, explicit end as completed or cancelled)
//! and records the finished record through a [`SessionStore`]. The `stats`
//! module turns the accumulated history into rolling-window totals and
//! per-day buckets on demand.

pub mod models;
pub mod reminder;
pub mod settings;
pub mod stats;
pub mod store;
pub mod timer;

pub use models::{DailyStats, Session, SessionStats};
pub use reminder::{LocalScheduler, ReminderContent, ReminderHandle, ReminderScheduler};
pub use settings::{ReminderSettings, SettingsStore};
pub use store::{JsonFileStore, SessionStore, SqliteStore};
pub use timer::{SessionController, TimerSnapshot, TimerStatus};

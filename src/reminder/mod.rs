//! Goal-reached reminder scheduling.
//!
//! Only the scheduling *decision* lives here: when a reminder should fire
//! relative to session start, and how to cancel a pending one. Delivery is
//! whatever the implementation wires up; the timer itself stays the source
//! of truth for elapsed time, so a lost reminder is acceptable degradation.

mod local;

pub use local::LocalScheduler;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What a fired reminder should say.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderContent {
    pub title: String,
    pub body: String,
}

impl ReminderContent {
    /// The goal-reached message for a session with the given goal.
    pub fn goal_reached(goal_minutes: u32) -> Self {
        Self {
            title: "Goal Reached!".to_string(),
            body: format!("You've completed {goal_minutes} minutes of focused work."),
        }
    }
}

/// Opaque handle to a pending reminder, used only for cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReminderHandle(pub String);

/// Scheduling seam. Every operation is best-effort from the caller's point
/// of view: a denied permission or failed schedule yields `None`, and
/// `cancel` swallows its failures.
#[async_trait]
pub trait ReminderScheduler: Send + Sync {
    /// Whether reminders may be scheduled at all.
    async fn request_permission(&self) -> bool;

    /// Schedules `content` to fire after `delay`. `None` when not permitted
    /// or on failure; never an error.
    async fn schedule(&self, delay: Duration, content: ReminderContent) -> Option<ReminderHandle>;

    /// Cancels a pending reminder. A handle that already fired or was never
    /// scheduled is silently ignored.
    async fn cancel(&self, handle: &ReminderHandle);
}

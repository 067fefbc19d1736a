use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{error, info, warn};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time,
};
use uuid::Uuid;

use crate::models::Session;
use crate::reminder::{ReminderContent, ReminderScheduler};
use crate::store::SessionStore;

use super::{TimerSnapshot, TimerState, TimerStatus};

/// Owns the single current-session state machine and coordinates the store
/// and reminder scheduler around it.
///
/// The controller is an owned value, not a global: dropping it is the
/// safety-net cancellation path, so tying it to the owning scope guarantees
/// no orphaned active session survives an uncleanly dismissed owner.
pub struct SessionController {
    state: Arc<Mutex<TimerState>>,
    store: Arc<dyn SessionStore>,
    scheduler: Arc<dyn ReminderScheduler>,
    // std Mutex so every exit path, including Drop, can abort synchronously.
    ticker: std::sync::Mutex<Option<JoinHandle<()>>>,
    tick_interval: Duration,
    snapshot_tx: watch::Sender<TimerSnapshot>,
}

impl SessionController {
    pub fn new(store: Arc<dyn SessionStore>, scheduler: Arc<dyn ReminderScheduler>) -> Self {
        Self::with_tick_interval(store, scheduler, Duration::from_secs(1))
    }

    pub fn with_tick_interval(
        store: Arc<dyn SessionStore>,
        scheduler: Arc<dyn ReminderScheduler>,
        tick_interval: Duration,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(TimerSnapshot::idle());
        Self {
            state: Arc::new(Mutex::new(TimerState::new())),
            store,
            scheduler,
            ticker: std::sync::Mutex::new(None),
            tick_interval,
            snapshot_tx,
        }
    }

    /// Starts a new session. Input is assumed pre-validated (non-empty task
    /// name, positive goal); the controller accepts it as given. Errors only
    /// when a session is already active.
    pub async fn start_session(
        &self,
        task_name: impl Into<String>,
        goal_minutes: u32,
    ) -> Result<Session> {
        let mut state = self.state.lock().await;
        if state.status != TimerStatus::Idle {
            return Err(anyhow!("a session is already active"));
        }

        let started_at = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            task_name: task_name.into(),
            goal_duration: goal_minutes,
            start_time: started_at,
            end_time: None,
            duration: 0,
            completed: false,
        };

        // Best-effort: a denied permission or failed schedule never blocks
        // the session from starting.
        let reminder = if self.scheduler.request_permission().await {
            self.scheduler
                .schedule(
                    Duration::from_secs(session.goal_secs()),
                    ReminderContent::goal_reached(goal_minutes),
                )
                .await
        } else {
            None
        };

        state.begin(session.clone(), reminder);
        let snapshot = state.snapshot(started_at);
        drop(state);

        self.spawn_ticker();
        self.snapshot_tx.send_replace(snapshot);

        info!(
            "started session {} ({:?}, goal {}m)",
            session.id, session.task_name, session.goal_duration
        );
        Ok(session)
    }

    /// Ends the active session with the caller-asserted outcome, persists it
    /// and cancels the pending reminder. A store write failure propagates;
    /// the finished record is not retried internally.
    pub async fn end_session(&self, completed: bool) -> Result<Session> {
        let ended_at = Utc::now();
        let (session, reminder) = {
            let mut state = self.state.lock().await;
            state
                .finish(ended_at, completed)
                .ok_or_else(|| anyhow!("no active session to end"))?
        };

        // The ticker dies before anything awaits, on this as on every other
        // exit path, so it can never publish a stale session.
        self.cancel_ticker();
        self.snapshot_tx.send_replace(TimerSnapshot::idle());

        self.store
            .append(&session)
            .await
            .with_context(|| format!("failed to persist session {}", session.id))?;

        if let Some(handle) = reminder {
            // Best-effort; the timer itself remains the source of truth.
            self.scheduler.cancel(&handle).await;
        }

        info!(
            "ended session {} after {}s ({})",
            session.id,
            session.duration,
            if session.completed { "completed" } else { "cancelled" }
        );
        Ok(session)
    }

    /// The no-argument end surface: infers completed-vs-cancelled from the
    /// elapsed-vs-goal relationship at the moment of invocation.
    pub async fn finish_session(&self) -> Result<Session> {
        let now = Utc::now();
        let completed = {
            let state = self.state.lock().await;
            if state.session.is_none() {
                return Err(anyhow!("no active session to end"));
            }
            state.goal_reached(now)
        };
        self.end_session(completed).await
    }

    /// Current view of the timer, elapsed time recomputed from the wall
    /// clock on every call.
    pub async fn snapshot(&self) -> TimerSnapshot {
        self.state.lock().await.snapshot(Utc::now())
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.status == TimerStatus::Active
    }

    /// Observer feed; the ticker publishes a fresh snapshot every interval
    /// while a session is active.
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    fn spawn_ticker(&self) {
        let mut guard = match self.ticker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = guard.take() {
            handle.abort();
        }

        let state = Arc::clone(&self.state);
        let snapshot_tx = self.snapshot_tx.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.tick().await; // the immediate first tick
            loop {
                interval.tick().await;

                let snapshot = {
                    let state = state.lock().await;
                    if state.status != TimerStatus::Active {
                        break;
                    }
                    state.snapshot(Utc::now())
                };
                snapshot_tx.send_replace(snapshot);
            }
        });

        *guard = Some(handle);
    }

    fn cancel_ticker(&self) {
        let mut guard = match self.ticker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = guard.take() {
            handle.abort();
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.cancel_ticker();

        // Safety-net cancellation: an owner torn down mid-session must not
        // leave an orphaned active record. Persistence is detached and
        // fire-and-forget by design; its failure is logged and discarded.
        let abandoned = self
            .state
            .try_lock()
            .ok()
            .and_then(|mut state| state.finish(Utc::now(), false));

        if let Some((session, reminder)) = abandoned {
            warn!(
                "controller dropped with active session {}; recording cancellation",
                session.id
            );
            let store = Arc::clone(&self.store);
            let scheduler = Arc::clone(&self.scheduler);
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(async move {
                        if let Err(err) = store.append(&session).await {
                            error!(
                                "failed to persist abandoned session {}: {err:#}",
                                session.id
                            );
                        }
                        if let Some(handle) = reminder {
                            scheduler.cancel(&handle).await;
                        }
                    });
                }
                Err(_) => error!(
                    "no async runtime at teardown; abandoned session {} was not persisted",
                    session.id
                ),
            }
        }
    }
}

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time,
};
use uuid::Uuid;

use super::{ReminderContent, ReminderHandle, ReminderScheduler};

/// In-process scheduler: each pending reminder is a sleeping tokio task that
/// delivers its content over an mpsc channel when the delay elapses.
/// Cancellation aborts the task.
pub struct LocalScheduler {
    enabled: bool,
    fired_tx: mpsc::UnboundedSender<ReminderContent>,
    pending: Arc<Mutex<HashMap<ReminderHandle, JoinHandle<()>>>>,
}

impl LocalScheduler {
    /// Returns the scheduler and the receiving end for fired reminders.
    /// `enabled: false` models a denied notification permission.
    pub fn new(enabled: bool) -> (Self, mpsc::UnboundedReceiver<ReminderContent>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        (
            Self {
                enabled,
                fired_tx,
                pending: Arc::new(Mutex::new(HashMap::new())),
            },
            fired_rx,
        )
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[async_trait]
impl ReminderScheduler for LocalScheduler {
    async fn request_permission(&self) -> bool {
        self.enabled
    }

    async fn schedule(&self, delay: Duration, content: ReminderContent) -> Option<ReminderHandle> {
        if !self.enabled {
            return None;
        }

        let handle = ReminderHandle(Uuid::new_v4().to_string());
        let fired_tx = self.fired_tx.clone();
        let pending = Arc::clone(&self.pending);
        let handle_for_task = handle.clone();

        let task = tokio::spawn(async move {
            time::sleep(delay).await;
            pending.lock().await.remove(&handle_for_task);
            if fired_tx.send(content).is_err() {
                // Receiver gone; the reminder has nowhere to go.
                warn!("reminder fired with no listener");
            }
        });

        self.pending.lock().await.insert(handle.clone(), task);
        debug!("scheduled reminder {} in {:?}", handle.0, delay);
        Some(handle)
    }

    async fn cancel(&self, handle: &ReminderHandle) {
        if let Some(task) = self.pending.lock().await.remove(handle) {
            task.abort();
            debug!("cancelled reminder {}", handle.0);
        }
    }
}

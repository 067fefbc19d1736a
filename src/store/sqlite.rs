//! SQLite-backed session store.
//!
//! `rusqlite` connections are not `Sync`, so all database work runs on a
//! dedicated worker thread that owns the connection; async callers hand it
//! closures over an mpsc channel and await the reply on a oneshot.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection};
use tokio::sync::oneshot;

use super::SessionStore;
use crate::models::Session;

const CURRENT_SCHEMA_VERSION: i32 = 1;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    task_name TEXT NOT NULL,
    goal_duration INTEGER NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT,
    duration INTEGER NOT NULL,
    completed INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sessions_start_time ON sessions(start_time);
";

type StoreTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum StoreCommand {
    Execute(StoreTask),
    Shutdown,
}

struct SqliteStoreInner {
    sender: mpsc::Sender<StoreCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for SqliteStoreInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(StoreCommand::Shutdown) {
                error!("failed to send shutdown to store thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("failed to join store thread: {join_err:?}");
            }
        }
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    inner: Arc<SqliteStoreInner>,
    db_path: Arc<PathBuf>,
}

impl SqliteStore {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<StoreCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("itz-store".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("failed to enable WAL mode: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run store migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("store initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        StoreCommand::Execute(task) => task(&mut conn),
                        StoreCommand::Shutdown => break,
                    }
                }

                info!("session store thread shutting down");
            })
            .context("failed to spawn store worker thread")?;

        ready_rx
            .recv()
            .context("store worker exited before signaling readiness")??;

        info!("session store initialized at {}", db_path.display());

        Ok(Self {
            inner: Arc::new(SqliteStoreInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = StoreCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("store caller dropped before receiving result");
            }
        }));

        self.inner
            .sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to store thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("store thread terminated unexpectedly"))?
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn get_all(&self) -> Vec<Session> {
        let result = self
            .execute(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, task_name, goal_duration, start_time, end_time, duration, completed
                     FROM sessions
                     ORDER BY rowid ASC",
                )?;

                let mut rows = stmt.query([])?;
                let mut sessions = Vec::new();
                while let Some(row) = rows.next()? {
                    sessions.push(Session {
                        id: row.get(0)?,
                        task_name: row.get(1)?,
                        goal_duration: row.get(2)?,
                        start_time: parse_datetime(&row.get::<_, String>(3)?)?,
                        end_time: row
                            .get::<_, Option<String>>(4)?
                            .map(|s| parse_datetime(&s))
                            .transpose()?,
                        duration: to_u64(row.get::<_, i64>(5)?)?,
                        completed: row.get::<_, i64>(6)? != 0,
                    });
                }
                Ok(sessions)
            })
            .await;

        match result {
            Ok(sessions) => sessions,
            Err(err) => {
                error!("failed to load sessions: {err:#}");
                Vec::new()
            }
        }
    }

    async fn append(&self, session: &Session) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, task_name, goal_duration, start_time, end_time, duration, completed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.task_name,
                    record.goal_duration,
                    record.start_time.to_rfc3339(),
                    record.end_time.as_ref().map(|dt| dt.to_rfc3339()),
                    to_i64(record.duration)?,
                    record.completed as i64,
                ],
            )
            .context("failed to insert session")?;
            Ok(())
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute("DELETE FROM sessions", [])
                .context("failed to clear sessions")?;
            Ok(())
        })
        .await
    }
}

fn run_migrations(conn: &mut Connection) -> Result<()> {
    let mut version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;

    if version > CURRENT_SCHEMA_VERSION {
        bail!(
            "database version ({}) is newer than supported schema ({})",
            version,
            CURRENT_SCHEMA_VERSION
        );
    }

    while version < CURRENT_SCHEMA_VERSION {
        let next_version = version + 1;
        match next_version {
            1 => conn
                .execute_batch(SCHEMA_V1)
                .context("failed to apply schema v1")?,
            other => bail!("no migration defined for version {other}"),
        }
        version = next_version;
    }

    conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
        .context("failed to update user_version pragma")?;

    Ok(())
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

fn to_u64(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("value {value} is negative"))
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(id: &str, completed: bool) -> Session {
        Session {
            id: id.into(),
            task_name: "focus".into(),
            goal_duration: 25,
            start_time: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            end_time: Some(Utc.timestamp_opt(1_700_000_450, 0).unwrap()),
            duration: 450,
            completed,
        }
    }

    #[tokio::test]
    async fn append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("sessions.db")).unwrap();

        assert!(store.get_all().await.is_empty());

        store.append(&sample("a", true)).await.unwrap();
        store.append(&sample("b", false)).await.unwrap();

        let sessions = store.get_all().await;
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0], sample("a", true));
        assert_eq!(sessions[1], sample("b", false));
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("sessions.db")).unwrap();

        store.append(&sample("a", true)).await.unwrap();
        assert!(store.append(&sample("a", false)).await.is_err());
    }

    #[tokio::test]
    async fn history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");

        {
            let store = SqliteStore::new(path.clone()).unwrap();
            store.append(&sample("a", true)).await.unwrap();
        }

        let store = SqliteStore::new(path).unwrap();
        assert_eq!(store.get_all().await.len(), 1);
    }

    #[tokio::test]
    async fn clear_empties_the_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("sessions.db")).unwrap();

        store.append(&sample("a", true)).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.get_all().await.is_empty());
    }
}

//! Single-file JSON store: the whole session list lives under one path and
//! every append rewrites it in full. Atomicity is whatever the filesystem
//! gives us; the worst case on a torn write is losing the newest entry, not
//! corrupting the machinery around it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::error;
use tokio::fs;
use tokio::sync::Mutex;

use super::SessionStore;
use crate::models::Session;

pub struct JsonFileStore {
    path: PathBuf,
    // Serializes the read-modify-write cycle of `append`.
    write_guard: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create store directory {}", parent.display())
            })?;
        }
        Ok(Self {
            path,
            write_guard: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the list, treating a missing file as empty and propagating
    /// everything else.
    async fn load(&self) -> Result<Vec<Session>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", self.path.display()))
            }
        };

        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse session list in {}", self.path.display()))
    }

    async fn persist(&self, sessions: &[Session]) -> Result<()> {
        let serialized = serde_json::to_string(sessions).context("failed to encode sessions")?;
        fs::write(&self.path, serialized)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn get_all(&self) -> Vec<Session> {
        match self.load().await {
            Ok(sessions) => sessions,
            Err(err) => {
                error!("failed to load sessions: {err:#}");
                Vec::new()
            }
        }
    }

    async fn append(&self, session: &Session) -> Result<()> {
        let _guard = self.write_guard.lock().await;

        // Unlike `get_all`, an unreadable existing file is an error here:
        // rewriting over it would truncate the whole history to one entry.
        let mut sessions = self.load().await?;
        sessions.push(session.clone());
        self.persist(&sessions).await
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to remove {}", self.path.display()))
            }
        }
    }
}

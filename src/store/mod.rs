//! Durable, append-only storage for finished sessions.

mod file;
mod sqlite;

pub use file::JsonFileStore;
pub use sqlite::SqliteStore;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Session;

/// Append-only history of finished sessions.
///
/// Reads degrade to an empty list: a backend that cannot load its history
/// logs the failure and reports no sessions, so callers cannot distinguish
/// "no data" from "read failed". Writes propagate their errors; retrying a
/// failed append is the caller's responsibility.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// All finished sessions in append order. Empty on read failure.
    async fn get_all(&self) -> Vec<Session>;

    /// Persists one finished session. The record is never mutated afterwards.
    async fn append(&self, session: &Session) -> Result<()>;

    /// Removes the entire history. Reset surface only.
    async fn clear(&self) -> Result<()>;
}

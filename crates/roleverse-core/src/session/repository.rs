//! Session repository trait.
//!
//! Defines the interface for session persistence operations.

use super::model::Session;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// An abstract repository for managing session persistence.
///
/// This trait decouples the game logic from the storage mechanism
/// (in-memory map, JSON files, a networked cache).
///
/// # Implementation Notes
///
/// Callers follow a read-modify-write pattern: `find_by_id`, mutate in memory,
/// then `save` the whole session. Implementations do not need field-level
/// updates, but `save` must replace the stored session atomically.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Finds a session by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Session))`: Session found
    /// - `Ok(None)`: Session not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>>;

    /// Saves a session to storage, replacing any previous version.
    async fn save(&self, session: &Session) -> Result<()>;

    /// Deletes a session from storage.
    ///
    /// Deleting a session that does not exist is not an error.
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Lists all stored sessions.
    async fn list_all(&self) -> Result<Vec<Session>>;

    /// Lists IDs of sessions whose last activity is older than `cutoff`.
    ///
    /// The default implementation scans `list_all`; backends with an index on
    /// activity time should override it.
    async fn list_idle_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        let sessions = self.list_all().await?;
        Ok(sessions
            .into_iter()
            .filter(|session| session.is_idle_since(cutoff))
            .map(|session| session.id)
            .collect())
    }
}

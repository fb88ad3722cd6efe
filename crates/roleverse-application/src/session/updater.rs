//! Session updater helper for the locked "find → update → save" pattern.

use super::TurnLocks;
use roleverse_core::error::{Result, RoleverseError};
use roleverse_core::session::{Session, SessionRepository};
use std::sync::Arc;

/// Applies synchronous edits to a stored session under its turn lock.
///
/// The edit runs on an in-memory copy; if it fails nothing is written.
pub struct SessionUpdater {
    repository: Arc<dyn SessionRepository>,
    locks: Arc<TurnLocks>,
}

impl SessionUpdater {
    pub fn new(repository: Arc<dyn SessionRepository>, locks: Arc<TurnLocks>) -> Self {
        Self { repository, locks }
    }

    /// Updates a session by applying the given updater function.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The session doesn't exist
    /// - The updater function returns an error
    /// - Saving to storage fails
    pub async fn update<F>(&self, session_id: &str, updater: F) -> Result<Session>
    where
        F: FnOnce(&mut Session) -> Result<()>,
    {
        let _guard = self.locks.acquire(session_id).await;

        let mut session = self
            .repository
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| RoleverseError::session_not_found(session_id))?;

        updater(&mut session)?;
        session.touch();

        tracing::debug!("[SessionUpdater] Saving session: id={}", session.id);
        self.repository.save(&session).await?;

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CountingRepository;

    #[tokio::test]
    async fn test_update_applies_and_saves() {
        let repository = Arc::new(CountingRepository::with_session(Session::new("s-1")));
        let updater = SessionUpdater::new(repository.clone(), Arc::new(TurnLocks::new()));

        let updated = updater
            .update("s-1", |session| {
                session.world_context = "A foggy harbor.".to_string();
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(updated.world_context, "A foggy harbor.");
        assert_eq!(repository.saves(), 1);
        assert_eq!(repository.stored("s-1").unwrap().world_context, "A foggy harbor.");
    }

    #[tokio::test]
    async fn test_failed_update_writes_nothing() {
        let repository = Arc::new(CountingRepository::with_session(Session::new("s-1")));
        let updater = SessionUpdater::new(repository.clone(), Arc::new(TurnLocks::new()));

        let err = updater
            .update("s-1", |session| {
                session.world_context = "changed".to_string();
                Err(RoleverseError::validation("nope"))
            })
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(repository.saves(), 0);
        assert_eq!(repository.stored("s-1").unwrap().world_context, "");
    }

    #[tokio::test]
    async fn test_missing_session_is_not_found() {
        let repository = Arc::new(CountingRepository::new());
        let updater = SessionUpdater::new(repository, Arc::new(TurnLocks::new()));
        let err = updater.update("ghost", |_| Ok(())).await.unwrap_err();
        assert!(err.is_not_found());
    }
}

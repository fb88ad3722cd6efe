//! File-backed SessionRepository.
//!
//! Directory structure:
//! ```text
//! sessions_dir/
//! ├── <session-id>.json
//! └── <session-id>.lock     # advisory writer lock
//! ```

use crate::paths::RoleversePaths;
use crate::storage::{AtomicJsonError, AtomicJsonFile};
use async_trait::async_trait;
use roleverse_core::error::{Result, RoleverseError};
use roleverse_core::session::{Session, SessionRepository};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Stores each session as one JSON document, durable across restarts.
pub struct FileSessionRepository {
    sessions_dir: PathBuf,
}

impl FileSessionRepository {
    /// Creates a repository rooted at `sessions_dir`, creating it if needed.
    pub async fn new(sessions_dir: impl AsRef<Path>) -> Result<Self> {
        let sessions_dir = sessions_dir.as_ref().to_path_buf();
        fs::create_dir_all(&sessions_dir).await?;
        Ok(Self { sessions_dir })
    }

    /// Creates a repository at the default data location.
    pub async fn default_location() -> Result<Self> {
        let dir = RoleversePaths::sessions_dir()
            .map_err(|e| RoleverseError::config(format!("Failed to get sessions directory: {}", e)))?;
        Self::new(dir).await
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn session_file(&self, session_id: &str) -> Result<AtomicJsonFile<Session>> {
        validate_session_id(session_id)?;
        Ok(AtomicJsonFile::new(
            self.sessions_dir.join(format!("{}.json", session_id)),
        ))
    }
}

/// Session IDs become file names, so only a conservative alphabet is allowed.
fn validate_session_id(session_id: &str) -> Result<()> {
    let valid = !session_id.is_empty()
        && session_id.len() <= 128
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(RoleverseError::validation(format!(
            "Invalid session id '{}'",
            session_id
        )))
    }
}

fn storage_error(err: AtomicJsonError) -> RoleverseError {
    match err {
        AtomicJsonError::JsonError(e) => e.into(),
        other => RoleverseError::data_access(other.to_string()),
    }
}

async fn blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> std::result::Result<T, AtomicJsonError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| RoleverseError::internal(format!("Storage task failed: {}", e)))?
        .map_err(storage_error)
}

#[async_trait]
impl SessionRepository for FileSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        let file = match self.session_file(session_id) {
            Ok(file) => file,
            // an id that can't be a file name can't have been stored
            Err(e) if e.is_validation() => return Ok(None),
            Err(e) => return Err(e),
        };
        blocking(move || file.load()).await
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let file = self.session_file(&session.id)?;
        let snapshot = session.clone();
        blocking(move || file.save(&snapshot)).await?;
        tracing::debug!("[FileSessionRepository] Saved session {}", session.id);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let file = self.session_file(session_id)?;
        blocking(move || file.remove()).await?;

        let lock_path = self.sessions_dir.join(format!("{}.lock", session_id));
        if let Err(e) = fs::remove_file(&lock_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    "[FileSessionRepository] Failed to remove lock file {:?}: {}",
                    lock_path,
                    e
                );
            }
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        let mut entries = fs::read_dir(&self.sessions_dir).await?;
        let mut sessions = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(session_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            // temp files start with a dot and never match the id alphabet
            if validate_session_id(session_id).is_err() {
                continue;
            }

            match self.find_by_id(session_id).await {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        "[FileSessionRepository] Skipping unreadable session file {:?}: {}",
                        path,
                        e
                    );
                }
            }
        }

        sessions.sort_by(|a, b| b.last_active.cmp(&a.last_active));
        Ok(sessions)
    }
}

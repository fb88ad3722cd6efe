//! Hand-written collaborators shared by the application tests.

use async_trait::async_trait;
use roleverse_core::error::Result;
use roleverse_core::narrative::{ChatMessage, ModelError, NarrativeModel};
use roleverse_core::session::{Session, SessionRepository};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Replays a fixed list of replies and records every request.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<std::result::Result<String, ModelError>>>,
    requests: Mutex<Vec<(Vec<ChatMessage>, f32)>>,
}

impl ScriptedModel {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = std::result::Result<&'static str, ModelError>>,
    {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|reply| reply.map(str::to_string))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A model whose replies are built at runtime; all succeed.
    pub fn owned<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A model that must never be called; every call fails.
    pub fn silent() -> Self {
        Self::new(std::iter::empty())
    }

    pub fn requests(&self) -> Vec<(Vec<ChatMessage>, f32)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl NarrativeModel for ScriptedModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> std::result::Result<String, ModelError> {
        // let other tasks interleave as they would around a network call
        tokio::task::yield_now().await;
        self.requests
            .lock()
            .unwrap()
            .push((messages.to_vec(), temperature));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Malformed("script exhausted".to_string())))
    }
}

/// In-memory repository that counts writes.
#[derive(Default)]
pub struct CountingRepository {
    sessions: Mutex<HashMap<String, Session>>,
    saves: AtomicUsize,
    deletes: AtomicUsize,
}

impl CountingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        let repository = Self::new();
        repository
            .sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
        repository
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn stored(&self, session_id: &str) -> Option<Session> {
        self.sessions.lock().unwrap().get(session_id).cloned()
    }
}

#[async_trait]
impl SessionRepository for CountingRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.stored(session_id))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.sessions.lock().unwrap().remove(session_id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        Ok(self.sessions.lock().unwrap().values().cloned().collect())
    }
}

/// A session ready to play: character, stats and some context.
pub fn playing_session(id: &str) -> Session {
    let mut session = Session::new(id);
    session.character = Some("A stubborn dwarf miner".to_string());
    session.ruleset = Some("Classic fantasy.".to_string());
    session.universe = Some("fantasy".to_string());
    session.stats.insert("Strength".to_string(), 8);
    session.add_item("Pickaxe");
    session.world_context = "Deep in an abandoned mine, facing a rotten door.".to_string();
    session.messages.push(roleverse_core::session::ConversationMessage::assistant(
        "You stand before a rotten wooden door.",
    ));
    session
}

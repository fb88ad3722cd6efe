//! Response cache for stateless prompts.
//!
//! Validation, difficulty and world-context prompts are single user messages
//! whose answer depends only on their text, so identical requests within a
//! short window can reuse the previous reply. Multi-message conversations
//! (narration) and creative single prompts above
//! [`MAX_CACHED_TEMPERATURE`] always go to the model.

use async_trait::async_trait;
use roleverse_core::narrative::{ChatMessage, ModelError, NarrativeModel};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Requests sampled hotter than this are never cached.
pub const MAX_CACHED_TEMPERATURE: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    message: ChatMessage,
    temperature_bits: u32,
}

struct CacheEntry {
    response: String,
    inserted_at: Instant,
}

/// Decorates a [`NarrativeModel`] with a bounded TTL cache.
pub struct CachedNarrativeModel {
    inner: Arc<dyn NarrativeModel>,
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
    ttl: Duration,
    max_entries: usize,
}

impl CachedNarrativeModel {
    pub fn new(inner: Arc<dyn NarrativeModel>, ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner,
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            max_entries,
        }
    }

    /// Number of cached replies, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Clears all cached replies.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    fn cache_key(messages: &[ChatMessage], temperature: f32) -> Option<CacheKey> {
        match messages {
            [message] if temperature <= MAX_CACHED_TEMPERATURE => Some(CacheKey {
                message: message.clone(),
                temperature_bits: temperature.to_bits(),
            }),
            _ => None,
        }
    }

    async fn lookup(&self, key: &CacheKey) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
            .map(|entry| entry.response.clone())
    }

    async fn store(&self, key: CacheKey, response: String) {
        if self.max_entries == 0 {
            return;
        }

        let mut entries = self.entries.write().await;
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        }
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                response,
                inserted_at: Instant::now(),
            },
        );
    }
}

#[async_trait]
impl NarrativeModel for CachedNarrativeModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, ModelError> {
        let Some(key) = Self::cache_key(messages, temperature) else {
            return self.inner.complete(messages, temperature).await;
        };

        if let Some(hit) = self.lookup(&key).await {
            tracing::debug!("[CachedNarrativeModel] Cache hit");
            return Ok(hit);
        }

        // failures are never cached
        let response = self.inner.complete(messages, temperature).await?;
        self.store(key, response.clone()).await;
        Ok(response)
    }
}

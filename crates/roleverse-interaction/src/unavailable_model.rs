//! Placeholder model used when no credential is configured.

use async_trait::async_trait;
use roleverse_core::narrative::{ChatMessage, ModelError, NarrativeModel};

/// A model that fails every call with [`ModelError::Unavailable`].
///
/// Lets the game run (and surface its fixed apologies) without an API key.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableModel;

#[async_trait]
impl NarrativeModel for UnavailableModel {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _temperature: f32,
    ) -> Result<String, ModelError> {
        Err(ModelError::Unavailable)
    }
}

//! Narrative model interface.
//!
//! The game delegates every judgment call (is this action possible, how hard
//! is it, what happened) to a text-completion model behind this trait.

use crate::session::{ConversationMessage, MessageRole};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A role-tagged message sent to the narrative model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    /// Creates a user-role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Creates an assistant-role message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ConversationMessage> for ChatMessage {
    fn from(message: &ConversationMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Failure of a single narrative model call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// No model client or credential is configured.
    #[error("Narrative model is not configured")]
    Unavailable,

    /// The call did not complete in time.
    #[error("Narrative model timed out")]
    Timeout,

    /// The service answered with an error.
    #[error("Narrative model service error ({status:?}): {message}")]
    Service {
        status: Option<u16>,
        message: String,
    },

    /// The service answered but the reply could not be used.
    #[error("Narrative model returned a malformed response: {0}")]
    Malformed(String),
}

/// A text-completion model that narrates the game.
#[async_trait]
pub trait NarrativeModel: Send + Sync {
    /// Completes the conversation and returns the generated text.
    ///
    /// # Arguments
    ///
    /// * `messages` - Ordered, role-tagged conversation
    /// * `temperature` - Sampling temperature
    async fn complete(&self, messages: &[ChatMessage], temperature: f32)
    -> Result<String, ModelError>;
}

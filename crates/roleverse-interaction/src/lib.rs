//! Narrative model clients.
//!
//! - [`ChatCompletionClient`]: OpenAI-compatible HTTP endpoint (DeepSeek by default)
//! - [`UnavailableModel`]: stands in when no API key is configured
//! - [`CachedNarrativeModel`]: short-lived response cache for stateless prompts

pub mod cached_model;
pub mod chat_completion_client;
pub mod unavailable_model;

pub use cached_model::CachedNarrativeModel;
pub use chat_completion_client::ChatCompletionClient;
pub use unavailable_model::UnavailableModel;

//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: Core session domain model (`Session`, `SessionPhase`)
//! - `message`: Conversation message types (`MessageRole`, `ConversationMessage`)
//! - `repository`: Repository trait for session persistence

mod message;
mod model;
mod repository;

pub use message::{ConversationMessage, MessageRole};
pub use model::{MAX_HEALTH, Session, SessionPhase};
pub use repository::SessionRepository;

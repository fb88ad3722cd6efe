//! Domain layer of RoleVerse.
//!
//! Holds the session model and every pure game rule: the directive codec,
//! the chance engine, prompt templates and the universe catalog. Storage and
//! the narrative model are reached only through the traits defined here.

pub mod chance;
pub mod config;
pub mod directive;
pub mod error;
pub mod narrative;
pub mod prompt;
pub mod save;
pub mod session;
pub mod universe;

// Re-export common types
pub use error::{Result, RoleverseError};
pub use narrative::{ChatMessage, ModelError, NarrativeModel};
pub use save::SaveRecord;
pub use session::{Session, SessionRepository};

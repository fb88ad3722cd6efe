//! Application layer: turn resolution and session lifecycle.
//!
//! Both services share one [`TurnLocks`] registry so that at most one
//! mutating operation runs per session at a time.

pub mod roll;
pub mod session;
pub mod session_lifecycle;
pub mod turn_resolver;
pub mod views;

#[cfg(test)]
mod test_support;

pub use roll::{FixedRoll, RollSource, ThreadRngRoll};
pub use session::{SessionUpdater, TurnLocks};
pub use session_lifecycle::{CharacterOutcome, CharacterReport, SessionLifecycle};
pub use turn_resolver::{TurnOutcome, TurnReport, TurnResolver, TurnSettings};

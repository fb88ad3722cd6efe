pub mod turn_locks;
pub mod updater;

pub use turn_locks::TurnLocks;
pub use updater::SessionUpdater;

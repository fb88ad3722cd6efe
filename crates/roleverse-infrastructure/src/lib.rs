//! Infrastructure layer: session stores, file primitives, paths and config.

pub mod config_service;
pub mod file_session_repository;
pub mod memory_session_repository;
pub mod paths;
pub mod storage;

pub use config_service::ConfigService;
pub use file_session_repository::FileSessionRepository;
pub use memory_session_repository::MemorySessionRepository;
pub use paths::RoleversePaths;

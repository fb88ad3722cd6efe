pub mod play;
pub mod saves;
pub mod sweep;

pub mod join;
pub mod leave;
pub mod play;
pub mod replay;

pub mod create_commands;
pub mod music;

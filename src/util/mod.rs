pub mod alias;
pub mod config;
pub mod context;
pub mod cooldown;
pub mod help;
pub mod i18n;
pub mod perms;
pub mod play;
pub mod player;
pub mod text;
pub mod track;

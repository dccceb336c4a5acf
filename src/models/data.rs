use std::sync::Arc;

use crate::util::{config::BotSettings, cooldown::CooldownGate, i18n::I18n, player::PlayerRegistry};

/// poise の user data。コマンド間で共有する状態はすべてここに置く。
pub struct Data {
    pub players: Arc<PlayerRegistry>,
    pub replay_cooldown: Arc<CooldownGate>,
    pub i18n: Arc<I18n>,
    pub prefix: String,
}

impl Data {
    pub fn new(settings: &BotSettings) -> Self {
        Self {
            players: Arc::new(PlayerRegistry::new()),
            replay_cooldown: Arc::new(CooldownGate::new()),
            i18n: Arc::new(I18n::new(&settings.bot.locale, settings.messages.clone())),
            prefix: settings.bot.prefix.clone(),
        }
    }
}

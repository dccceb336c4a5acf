use std::sync::Arc;

use poise::serenity_prelude::{GuildId, async_trait};
use songbird::{Call, Event, EventContext, EventHandler, tracks::PlayMode};
use tokio::sync::Mutex;

use crate::util::{play::play_next, player::GuildPlayer};

#[derive(Clone)]
pub struct TrackEndHandler {
    pub guild_id: GuildId,
    pub call: Arc<Mutex<Call>>,
    pub player: Arc<GuildPlayer>,
}

#[async_trait]
impl EventHandler for TrackEndHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let EventContext::Track(tracks) = ctx else {
            return None;
        };
        let Some((state, handle)) = tracks.first() else {
            return None;
        };

        // スキップ直後などの古いイベントで現在の再生を壊さないよう、uuid を照合する
        let current = self.player.playing().await.map(|t| t.id);
        if current != Some(handle.uuid()) {
            return None;
        }

        if let PlayMode::Errored(e) = &state.playing {
            tracing::warn!(guild = %self.guild_id, error = ?e, "track errored; moving on");
        }

        play_next(self.guild_id, self.call.clone(), self.player.clone()).await;
        None
    }
}

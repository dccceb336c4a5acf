use std::{collections::VecDeque, sync::Arc};

use dashmap::DashMap;
use poise::serenity_prelude::{GuildId, async_trait};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::util::{alias::Error, context::CommandContext, track::TrackRequest};

const HISTORY_MAX: usize = 50;

/// リプレイ要求を受け付けるプレイヤー側の窓口
#[async_trait]
pub trait ReplayTarget: Send + Sync {
    /// 再生中の曲もキューも無いとき true
    async fn is_queue_empty(&self) -> bool;

    async fn playing_track(&self) -> Option<TrackRequest>;

    /// 指定した曲をキューの先頭に積み直す。実行者の権限で可否とメッセージを決めるのはプレイヤー側。
    async fn replay_last_track_for_member_perms(
        &self,
        ctx: &dyn CommandContext,
        track_ids: &[Uuid],
        success_message: String,
    ) -> Result<(), Error>;
}

pub trait PlayerLookup: Send + Sync {
    type Player: ReplayTarget;

    fn get_existing(&self, guild_id: GuildId) -> Option<Arc<Self::Player>>;
}

#[derive(Debug, Default)]
struct PlayerState {
    queue: VecDeque<TrackRequest>,
    playing: Option<TrackRequest>,
    history: VecDeque<TrackRequest>,
}

impl PlayerState {
    fn find(&self, id: Uuid) -> Option<&TrackRequest> {
        self.playing
            .iter()
            .chain(self.history.iter().rev())
            .chain(self.queue.iter())
            .find(|t| t.id == id)
    }
}

/// ギルドごとの再生状態（キュー・再生中・履歴）
#[derive(Debug)]
pub struct GuildPlayer {
    guild_id: GuildId,
    state: Mutex<PlayerState>,
}

impl GuildPlayer {
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            state: Mutex::new(PlayerState::default()),
        }
    }

    /// 末尾に追加（一般ユーザー用）。追加後のキュー長を返す。
    pub async fn enqueue(&self, req: TrackRequest) -> usize {
        let mut st = self.state.lock().await;
        st.queue.push_back(req);
        st.queue.len()
    }

    /// 何も再生していなければ先頭の曲を「再生中」にして返す
    pub async fn start_if_idle(&self) -> Option<TrackRequest> {
        let mut st = self.state.lock().await;
        if st.playing.is_some() {
            return None;
        }
        let next = st.queue.pop_front()?;
        st.playing = Some(next.clone());
        Some(next)
    }

    /// 再生中の曲を履歴へ送り、次の曲（無ければ None）を再生中にする
    pub async fn advance(&self) -> Option<TrackRequest> {
        let mut st = self.state.lock().await;
        if let Some(prev) = st.playing.take() {
            st.history.push_back(prev);
            while st.history.len() > HISTORY_MAX {
                st.history.pop_front();
            }
        }
        st.playing = st.queue.pop_front();
        st.playing.clone()
    }

    pub async fn playing(&self) -> Option<TrackRequest> {
        self.state.lock().await.playing.clone()
    }
}

#[async_trait]
impl ReplayTarget for GuildPlayer {
    async fn is_queue_empty(&self) -> bool {
        let st = self.state.lock().await;
        st.playing.is_none() && st.queue.is_empty()
    }

    async fn playing_track(&self) -> Option<TrackRequest> {
        self.playing().await
    }

    async fn replay_last_track_for_member_perms(
        &self,
        ctx: &dyn CommandContext,
        track_ids: &[Uuid],
        success_message: String,
    ) -> Result<(), Error> {
        let actor = ctx.actor();

        // 返信の await 前にロックを手放す
        let verdict = {
            let mut st = self.state.lock().await;
            let tracks: Vec<TrackRequest> = track_ids
                .iter()
                .filter_map(|id| st.find(*id).cloned())
                .collect();
            let foreign = tracks
                .iter()
                .filter(|t| t.requested_by != actor.user_id)
                .count();

            if tracks.is_empty() {
                Verdict::NotFound
            } else if actor.is_privileged() || foreign == 0 {
                for tr in tracks.iter().rev() {
                    st.queue.push_front(tr.requeued());
                }
                Verdict::Replayed(tracks.len())
            } else if tracks.len() == 1 {
                Verdict::Denied
            } else {
                Verdict::DeniedTooMany(foreign)
            }
        };

        match verdict {
            Verdict::NotFound => {
                ctx.reply(ctx.i18n("replayTrackNotFound")).await?;
            }
            Verdict::Replayed(n) => {
                tracing::info!(
                    guild = %self.guild_id,
                    user = %actor.user_id,
                    tracks = n,
                    "replayed tracks to the front of the queue"
                );
                ctx.reply(success_message).await?;
            }
            Verdict::Denied => {
                tracing::info!(guild = %self.guild_id, user = %actor.user_id, "replay denied");
                ctx.reply(ctx.i18n("replayDenied")).await?;
            }
            Verdict::DeniedTooMany(foreign) => {
                tracing::info!(guild = %self.guild_id, user = %actor.user_id, foreign, "replay denied");
                ctx.reply(ctx.i18n_format("replayDeniedTooManyTracks", &[foreign.to_string()]))
                    .await?;
            }
        }
        Ok(())
    }
}

enum Verdict {
    NotFound,
    Replayed(usize),
    Denied,
    DeniedTooMany(usize),
}

/// ギルド ID → プレイヤー
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: DashMap<GuildId, Arc<GuildPlayer>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<GuildPlayer> {
        self.players
            .entry(guild_id)
            .or_insert_with(|| Arc::new(GuildPlayer::new(guild_id)))
            .clone()
    }

    /// VC から抜けたギルドの状態を捨てる
    pub fn remove(&self, guild_id: GuildId) -> Option<Arc<GuildPlayer>> {
        self.players.remove(&guild_id).map(|(_, p)| p)
    }
}

impl PlayerLookup for PlayerRegistry {
    type Player = GuildPlayer;

    fn get_existing(&self, guild_id: GuildId) -> Option<Arc<GuildPlayer>> {
        self.players.get(&guild_id).map(|p| p.clone())
    }
}

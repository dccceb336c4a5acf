use std::sync::{Arc, OnceLock};

use poise::serenity_prelude::GuildId;
use songbird::{
    Call, Event, TrackEvent,
    input::{Input, YoutubeDl},
    tracks::Track,
};
use tokio::sync::Mutex;
use url::Url;

use crate::{
    handlers::track_end::TrackEndHandler,
    util::{player::GuildPlayer, track::TrackRequest},
};

pub fn get_http_client() -> reqwest::Client {
    static HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    HTTP_CLIENT.get_or_init(reqwest::Client::new).clone()
}

/// URL ならそのまま、検索語なら ytsearch として yt-dlp に渡す（遅延評価）
fn resolve_input(tr: &TrackRequest) -> Input {
    if Url::parse(&tr.url).is_ok() {
        YoutubeDl::new(get_http_client(), tr.url.clone()).into()
    } else {
        YoutubeDl::new_search(get_http_client(), tr.url.clone()).into()
    }
}

/// 1 曲を再生し、終了イベントで次の曲へ進むようにする。
///
/// ハンドルの uuid は `TrackRequest::id` と同じにしておく（古いイベントの判定に使う）。
pub async fn play_track_req(
    gid: GuildId,
    call: Arc<Mutex<Call>>,
    player: Arc<GuildPlayer>,
    tr: &TrackRequest,
) {
    tracing::info!(guild = %gid, url = %tr.url, title = %tr.effective_title(), "Play request");
    let handler = TrackEndHandler {
        guild_id: gid,
        call: call.clone(),
        player,
    };

    let track = Track::new_with_uuid(resolve_input(tr), tr.id);
    let handle = { call.lock().await.play_only(track) };
    handle
        .add_event(Event::Track(TrackEvent::End), handler.clone())
        .ok();
    handle.add_event(Event::Track(TrackEvent::Error), handler).ok();
}

/// 何も再生していなければキュー先頭から再生を始める
pub async fn start_if_idle(
    gid: GuildId,
    call: Arc<Mutex<Call>>,
    player: Arc<GuildPlayer>,
) -> Option<TrackRequest> {
    let next = player.start_if_idle().await?;
    play_track_req(gid, call, player, &next).await;
    Some(next)
}

/// 再生中の曲を終えて次へ進む。キューが空なら停止状態にする。
pub async fn play_next(
    gid: GuildId,
    call: Arc<Mutex<Call>>,
    player: Arc<GuildPlayer>,
) -> Option<TrackRequest> {
    let Some(next) = player.advance().await else {
        tracing::info!(guild = %gid, "queue finished");
        return None;
    };
    play_track_req(gid, call, player, &next).await;
    Some(next)
}

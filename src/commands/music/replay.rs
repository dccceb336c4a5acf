use chrono::Utc;
use poise::serenity_prelude::{GuildId, async_trait};

use crate::util::{
    alias::{Context, Error},
    context::CommandContext,
    cooldown::CooldownGate,
    help::format_command_help,
    perms::{Actor, PermissionLevel, resolve_actor},
    player::{PlayerLookup, ReplayTarget},
    text::escape_and_defuse,
};

/// このコマンドを実行できる最低権限（判定は poise の check 側）
pub const MINIMUM_PERMS: PermissionLevel = PermissionLevel::User;

/// 1 回の呼び出しがどこで終わったか
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// プレイヤーが無い、または再生中もキューも空
    Unavailable,
    /// クールダウン中。何も返信しない
    OnCooldown,
    /// 引数付きで呼ばれたので使い方を表示した
    ShowedHelp,
    /// 判定後に再生中の曲が消えていた（クールダウンは消費済み）
    TrackNotFound,
    /// プレイヤーにリプレイを依頼した
    Requested,
}

/// 再生中の曲をキューの先頭に積み直す。
///
/// 空チェックはクールダウン判定より先に行うので、空振りの呼び出しはクールダウンを消費しない。
/// クールダウン中は返信もしない。`Err` になるのは返信の送信に失敗したときだけ。
pub async fn run<L>(
    ctx: &dyn CommandContext,
    players: &L,
    gate: &CooldownGate,
    now_ms: i64,
) -> Result<ReplayOutcome, Error>
where
    L: PlayerLookup + ?Sized,
{
    let guild_id = ctx.guild_id();

    let mut player = players.get_existing(guild_id);
    if let Some(p) = &player {
        if p.is_queue_empty().await {
            player = None;
        }
    }
    let Some(player) = player else {
        ctx.reply(ctx.i18n("replayEmpty")).await?;
        return Ok(ReplayOutcome::Unavailable);
    };

    if !gate.try_admit(guild_id, now_ms) {
        tracing::debug!(guild = %guild_id, "replay suppressed by cooldown");
        return Ok(ReplayOutcome::OnCooldown);
    }

    if ctx.has_arguments() {
        ctx.send_formatted_command_help().await?;
        return Ok(ReplayOutcome::ShowedHelp);
    }

    let Some(track) = player.playing_track().await else {
        ctx.reply(ctx.i18n("replayTrackNotFound")).await?;
        return Ok(ReplayOutcome::TrackNotFound);
    };

    let success = ctx.i18n_format(
        "replaySuccess",
        &["1".to_string(), escape_and_defuse(track.effective_title())],
    );
    tracing::info!(
        guild = %guild_id,
        user = %ctx.actor().user_id,
        track = %track.id,
        "replay requested"
    );
    player
        .replay_last_track_for_member_perms(ctx, &[track.id], success)
        .await?;
    Ok(ReplayOutcome::Requested)
}

/// `#[rest]` の残り文字列を空白で区切る。空白だけなら引数なし。
fn split_args(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// poise のコンテキストを `CommandContext` として見せるアダプタ
struct PoiseInvocation<'a> {
    ctx: Context<'a>,
    guild_id: GuildId,
    actor: Actor,
    args: Vec<String>,
}

#[async_trait]
impl CommandContext for PoiseInvocation<'_> {
    fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    fn actor(&self) -> &Actor {
        &self.actor
    }

    fn has_arguments(&self) -> bool {
        !self.args.is_empty()
    }

    fn i18n(&self, key: &str) -> String {
        self.ctx.data().i18n.get(key)
    }

    fn i18n_format(&self, key: &str, args: &[String]) -> String {
        self.ctx.data().i18n.format(key, args)
    }

    async fn reply(&self, text: String) -> Result<(), Error> {
        self.ctx.say(text).await?;
        Ok(())
    }

    async fn send_formatted_command_help(&self) -> Result<(), Error> {
        let data = self.ctx.data();
        let help = format_command_help(&data.prefix, &self.ctx.command().name, &data.i18n);
        self.ctx.say(help).await?;
        Ok(())
    }
}

/// 再生中の曲をもう一度キューの先頭に追加します
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::util::perms::require_user"
)]
pub async fn replay(
    ctx: Context<'_>,
    #[rest]
    #[description = "引数は不要です（指定すると使い方を表示）"]
    args: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("サーバー内で実行してください")?;
    let invocation = PoiseInvocation {
        ctx,
        guild_id,
        actor: resolve_actor(ctx).await,
        args: split_args(args.as_deref()),
    };

    let data = ctx.data();
    let outcome = run(
        &invocation,
        data.players.as_ref(),
        &data.replay_cooldown,
        Utc::now().timestamp_millis(),
    )
    .await?;
    tracing::debug!(guild = %guild_id, ?outcome, "replay finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use dashmap::DashMap;
    use poise::serenity_prelude::UserId;
    use uuid::Uuid;

    use super::*;
    use crate::util::{context::testing::RecordingContext, track::TrackRequest};

    const NOW: i64 = 1_700_000_000_000;

    fn gid() -> GuildId {
        GuildId::new(77)
    }

    /// 呼び出しを記録するだけのプレイヤー
    #[derive(Default)]
    struct FakePlayer {
        queue_empty: bool,
        playing: Option<TrackRequest>,
        replay_calls: Mutex<Vec<(Vec<Uuid>, String)>>,
    }

    #[async_trait]
    impl ReplayTarget for FakePlayer {
        async fn is_queue_empty(&self) -> bool {
            self.queue_empty
        }

        async fn playing_track(&self) -> Option<TrackRequest> {
            self.playing.clone()
        }

        async fn replay_last_track_for_member_perms(
            &self,
            _ctx: &dyn CommandContext,
            track_ids: &[Uuid],
            success_message: String,
        ) -> Result<(), Error> {
            self.replay_calls
                .lock()
                .unwrap()
                .push((track_ids.to_vec(), success_message));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeRegistry {
        players: DashMap<GuildId, Arc<FakePlayer>>,
    }

    impl FakeRegistry {
        fn with(player: FakePlayer) -> (Self, Arc<FakePlayer>) {
            let player = Arc::new(player);
            let registry = Self::default();
            registry.players.insert(gid(), player.clone());
            (registry, player)
        }
    }

    impl PlayerLookup for FakeRegistry {
        type Player = FakePlayer;

        fn get_existing(&self, guild_id: GuildId) -> Option<Arc<FakePlayer>> {
            self.players.get(&guild_id).map(|p| p.clone())
        }
    }

    fn my_song() -> TrackRequest {
        TrackRequest::new("https://example.com/song".into(), UserId::new(1)).with_title("My Song")
    }

    fn playing_player() -> FakePlayer {
        FakePlayer {
            queue_empty: false,
            playing: Some(my_song()),
            ..Default::default()
        }
    }

    fn ctx() -> RecordingContext {
        RecordingContext::new(gid(), Actor::new(UserId::new(1), PermissionLevel::User))
    }

    #[test]
    fn blank_rest_argument_means_no_arguments() {
        assert!(split_args(None).is_empty());
        assert!(split_args(Some("")).is_empty());
        assert!(split_args(Some("  \t \n ")).is_empty());
        assert_eq!(split_args(Some(" 2-5  x ")), vec!["2-5", "x"]);
    }

    #[tokio::test]
    async fn whitespace_only_arguments_still_replay() {
        let (registry, player) = FakeRegistry::with(playing_player());
        let gate = CooldownGate::new();
        let mut ctx = ctx();
        ctx.args = split_args(Some("   "));

        let outcome = run(&ctx, &registry, &gate, NOW).await.unwrap();

        assert_eq!(outcome, ReplayOutcome::Requested);
        assert_eq!(ctx.help_calls(), 0);
        assert_eq!(player.replay_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_player_replies_unavailable_without_touching_cooldown() {
        let registry = FakeRegistry::default();
        let gate = CooldownGate::new();
        let ctx = ctx();

        let outcome = run(&ctx, &registry, &gate, NOW).await.unwrap();

        assert_eq!(outcome, ReplayOutcome::Unavailable);
        assert_eq!(ctx.replies(), vec![ctx.i18n.get("replayEmpty")]);
        assert!(gate.is_empty());
    }

    #[tokio::test]
    async fn empty_queue_replies_unavailable_without_touching_cooldown() {
        let (registry, player) = FakeRegistry::with(FakePlayer {
            queue_empty: true,
            ..Default::default()
        });
        let gate = CooldownGate::new();
        let ctx = ctx();

        let outcome = run(&ctx, &registry, &gate, NOW).await.unwrap();

        assert_eq!(outcome, ReplayOutcome::Unavailable);
        assert_eq!(ctx.replies(), vec![ctx.i18n.get("replayEmpty")]);
        assert!(gate.last_accepted(gid()).is_none());
        assert!(player.replay_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn successful_replay_passes_track_id_and_escaped_title() {
        let song = my_song();
        let (registry, player) = FakeRegistry::with(FakePlayer {
            playing: Some(song.clone()),
            ..playing_player()
        });
        let gate = CooldownGate::new();
        let ctx = ctx();

        let outcome = run(&ctx, &registry, &gate, NOW).await.unwrap();

        assert_eq!(outcome, ReplayOutcome::Requested);
        assert!(ctx.replies().is_empty());
        assert_eq!(ctx.help_calls(), 0);
        let calls = player.replay_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec![song.id]);
        assert!(calls[0].1.contains("My Song"));
        assert_eq!(gate.last_accepted(gid()), Some(NOW));
    }

    #[tokio::test]
    async fn title_markup_is_escaped_in_success_message() {
        let song = my_song().with_title("**@everyone**");
        let (registry, player) = FakeRegistry::with(FakePlayer {
            playing: Some(song),
            ..playing_player()
        });
        let gate = CooldownGate::new();

        run(&ctx(), &registry, &gate, NOW).await.unwrap();

        let calls = player.replay_calls.lock().unwrap();
        assert!(calls[0].1.contains("\\*\\*@\u{200B}everyone\\*\\*"));
        assert!(!calls[0].1.contains("@everyone"));
    }

    #[tokio::test]
    async fn second_call_inside_window_is_silent() {
        let (registry, player) = FakeRegistry::with(playing_player());
        let gate = CooldownGate::new();

        run(&ctx(), &registry, &gate, NOW).await.unwrap();

        let spam = ctx();
        let outcome = run(&spam, &registry, &gate, NOW + 500).await.unwrap();

        assert_eq!(outcome, ReplayOutcome::OnCooldown);
        assert!(spam.replies().is_empty());
        assert_eq!(spam.help_calls(), 0);
        assert_eq!(player.replay_calls.lock().unwrap().len(), 1);
        assert_eq!(gate.last_accepted(gid()), Some(NOW));
    }

    #[tokio::test]
    async fn call_after_window_is_admitted() {
        let (registry, player) = FakeRegistry::with(playing_player());
        let gate = CooldownGate::new();

        run(&ctx(), &registry, &gate, NOW).await.unwrap();
        let outcome = run(&ctx(), &registry, &gate, NOW + 501).await.unwrap();

        assert_eq!(outcome, ReplayOutcome::Requested);
        assert_eq!(player.replay_calls.lock().unwrap().len(), 2);
        assert_eq!(gate.last_accepted(gid()), Some(NOW + 501));
    }

    #[tokio::test]
    async fn arguments_show_help_and_consume_cooldown() {
        let (registry, player) = FakeRegistry::with(playing_player());
        let gate = CooldownGate::new();
        let ctx = ctx().with_args(&["2-5"]);

        let outcome = run(&ctx, &registry, &gate, NOW).await.unwrap();

        assert_eq!(outcome, ReplayOutcome::ShowedHelp);
        assert_eq!(ctx.help_calls(), 1);
        assert!(ctx.replies().is_empty());
        assert!(player.replay_calls.lock().unwrap().is_empty());
        assert!(gate.is_on_cooldown(gid(), NOW + 1));
    }

    #[tokio::test]
    async fn vanished_track_replies_not_found_and_keeps_cooldown() {
        let (registry, player) = FakeRegistry::with(FakePlayer {
            queue_empty: false,
            playing: None,
            ..Default::default()
        });
        let gate = CooldownGate::new();
        let ctx = ctx();

        let outcome = run(&ctx, &registry, &gate, NOW).await.unwrap();

        assert_eq!(outcome, ReplayOutcome::TrackNotFound);
        assert_eq!(ctx.replies(), vec![ctx.i18n.get("replayTrackNotFound")]);
        assert!(player.replay_calls.lock().unwrap().is_empty());
        assert_eq!(gate.last_accepted(gid()), Some(NOW));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_invocations_in_one_guild_admit_one() {
        let (registry, player) = FakeRegistry::with(playing_player());
        let registry = Arc::new(registry);
        let gate = Arc::new(CooldownGate::new());

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            let gate = gate.clone();
            tasks.push(tokio::spawn(async move {
                run(&ctx(), registry.as_ref(), &gate, NOW).await.unwrap()
            }));
        }
        let mut outcomes = Vec::new();
        for t in tasks {
            outcomes.push(t.await.unwrap());
        }

        let admitted = outcomes
            .iter()
            .filter(|o| **o == ReplayOutcome::Requested)
            .count();
        assert_eq!(admitted, 1);
        assert_eq!(outcomes.len() - admitted, 15);
        assert_eq!(player.replay_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn end_to_end_with_guild_player() {
        use crate::util::player::PlayerRegistry;

        let registry = PlayerRegistry::new();
        let player = registry.get_or_create(gid());
        player.enqueue(my_song()).await;
        player.start_if_idle().await.unwrap();
        let gate = CooldownGate::new();
        let ctx = ctx();

        let outcome = run(&ctx, &registry, &gate, NOW).await.unwrap();

        assert_eq!(outcome, ReplayOutcome::Requested);
        assert_eq!(
            ctx.replies(),
            vec![ctx.i18n.format("replaySuccess", &["1".into(), "My Song".into()])]
        );
        let next = player.advance().await.unwrap();
        assert_eq!(next.effective_title(), "My Song");
        assert_eq!(MINIMUM_PERMS, PermissionLevel::User);
    }
}

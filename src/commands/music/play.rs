use crate::{
    commands::music::join::_join,
    util::{
        alias::{Context, Error},
        play::start_if_idle,
        text::escape_and_defuse,
        track::TrackRequest,
    },
};

/// 曲をキューに追加し、何も再生していなければそのまま再生を始める
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn play(
    ctx: Context<'_>,
    #[rest]
    #[description = "YouTube URL または検索語"]
    query: String,
) -> Result<(), Error> {
    ctx.defer().await?;
    let guild_id = ctx.guild_id().ok_or("サーバー内で実行してください")?;

    let existing = songbird::get(ctx.serenity_context())
        .await
        .ok_or("Songbird 未初期化")?
        .get(guild_id);
    let call = match existing {
        Some(call) => call,
        None => _join(&ctx, guild_id, None).await?,
    };

    let req = TrackRequest::from_url(query, ctx.author().id).await?;
    let title = escape_and_defuse(req.effective_title());

    let player = ctx.data().players.get_or_create(guild_id);
    let position = player.enqueue(req).await;

    match start_if_idle(guild_id, call, player).await {
        Some(_) => ctx.say(format!("▶️ 再生します: **{title}**")).await?,
        None => {
            ctx.say(format!("🎶 キューに追加しました ({position} 番目): **{title}**"))
                .await?
        }
    };
    Ok(())
}

use crate::util::alias::{Context, Error};

/// VC から切断し、そのギルドのキューと履歴を破棄する
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn leave(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("サーバー内で実行してください")?;
    let manager = songbird::get(ctx.serenity_context())
        .await
        .ok_or("Songbird 未初期化")?;
    if manager.get(guild_id).is_none() {
        ctx.say("❌ VC に接続していません").await?;
        return Ok(());
    }

    manager.remove(guild_id).await?;
    let dropped = ctx.data().players.remove(guild_id).is_some();
    tracing::info!(guild = %guild_id, dropped_player = dropped, "left voice channel");
    ctx.say("👋 VC から切断しました").await?;
    Ok(())
}

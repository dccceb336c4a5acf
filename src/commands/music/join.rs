use std::sync::Arc;

use poise::serenity_prelude::{self as serenity, Mentionable};
use songbird::Call;
use tokio::sync::Mutex;

use crate::util::alias::{Context, Error};

/// VC に接続する。チャンネル未指定なら実行者のいる VC。
pub async fn _join(
    ctx: &Context<'_>,
    guild_id: serenity::GuildId,
    channel_id: Option<serenity::ChannelId>,
) -> Result<Arc<Mutex<Call>>, Error> {
    let manager = songbird::get(ctx.serenity_context())
        .await
        .ok_or("Songbird 未初期化")?
        .clone();

    let connect_to = match channel_id {
        Some(ch) => ch,
        None => {
            let guild = ctx.guild().ok_or("Guild not found")?;
            guild
                .voice_states
                .get(&ctx.author().id)
                .and_then(|state| state.channel_id)
                .ok_or("❌ VC に参加してから実行してください")?
        }
    };

    let was_connected = manager.get(guild_id).is_some();
    let call = manager.join(guild_id, connect_to).await?;
    tracing::info!(guild = %guild_id, channel = %connect_to, "joined voice channel");
    if !was_connected {
        ctx.say(format!("Joined {}", connect_to.mention())).await?;
    }

    Ok(call)
}

#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn join(ctx: Context<'_>, channel_id: Option<serenity::ChannelId>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("サーバー内で実行してください")?;
    let _ = _join(&ctx, guild_id, channel_id).await?;
    Ok(())
}

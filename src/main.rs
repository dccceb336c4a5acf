mod commands;
mod handlers;
mod models;
mod util;

use std::{path::PathBuf, sync::Arc, time::Duration};

use chrono::Utc;
use clap::Parser;
use poise::serenity_prelude::{Client, GatewayIntents};
use songbird::SerenityInit;

use crate::{
    commands::create_commands::create_commands,
    models::data::Data,
    util::{alias::Error, config::BotSettings, cooldown::CooldownGate},
};

/// クールダウン表の掃除間隔
const COOLDOWN_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// ───── CLI 引数定義 ─────
#[derive(Parser)]
struct Cli {
    /// 設定ファイルのパス（未指定なら ./Setting.toml）
    #[arg(long, short, default_value = "Setting.toml")]
    config: PathBuf,
}

/// 期限切れのクールダウン記録を定期的に捨てる
async fn sweep_cooldowns(gate: Arc<CooldownGate>) {
    let mut ticker = tokio::time::interval(COOLDOWN_SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let removed = gate.prune(Utc::now().timestamp_millis());
        if removed > 0 {
            tracing::debug!(removed, remaining = gate.len(), "pruned replay cooldowns");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = BotSettings::load(&cli.config)?;
    tracing::info!(
        config = %cli.config.display(),
        prefix = %settings.bot.prefix,
        locale = %settings.bot.locale,
        "settings loaded"
    );

    let data = Data::new(&settings);
    let sweeper = tokio::spawn(sweep_cooldowns(data.replay_cooldown.clone()));

    // ── Poise フレームワーク ──
    let framework = poise::Framework::<Data, Error>::builder()
        .options(poise::FrameworkOptions {
            commands: create_commands(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(settings.bot.prefix.clone()),
                ..Default::default()
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Bot is ready!");
                Ok(data)
            })
        })
        .build();

    let intents = GatewayIntents::non_privileged()
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_VOICE_STATES;

    // ── Client 起動 ──
    let mut client = Client::builder(&settings.token.token, intents)
        .framework(framework)
        .register_songbird()
        .await?;

    let shard = tokio::spawn(async move {
        if let Err(why) = client.start().await {
            tracing::error!(error = ?why, "Client ended");
        }
    });

    tokio::signal::ctrl_c().await.ok();
    tracing::info!("Received Ctrl-C, shutting down.");

    sweeper.abort();
    shard.abort();
    Ok(())
}

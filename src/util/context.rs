use poise::serenity_prelude::{GuildId, async_trait};

use crate::util::{alias::Error, perms::Actor};

/// コマンド 1 回分の実行文脈。
///
/// 返信・ローカライズ・ヘルプ表示をまとめて抽象化しておき、プレイヤー側にもそのまま渡す。
/// poise 上では `PoiseInvocation` が実装する。
#[async_trait]
pub trait CommandContext: Send + Sync {
    fn guild_id(&self) -> GuildId;

    fn actor(&self) -> &Actor;

    fn has_arguments(&self) -> bool;

    fn i18n(&self, key: &str) -> String;

    fn i18n_format(&self, key: &str, args: &[String]) -> String;

    async fn reply(&self, text: String) -> Result<(), Error>;

    async fn send_formatted_command_help(&self) -> Result<(), Error>;
}

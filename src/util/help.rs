use crate::util::i18n::{I18n, format_placeholders};

/// `{0}` = プレフィックス, `{1}` = コマンド名。`#` 以降が説明文。
const REPLAY_USAGE: &str = "{0}{1}\n#";

/// コマンドの使い方を Markdown のコードブロックに整形する。
pub fn format_command_help(prefix: &str, command: &str, i18n: &I18n) -> String {
    let usage = format!("{REPLAY_USAGE}{}", i18n.get("helpReplayCommand"));
    let body = format_placeholders(&usage, &[prefix.to_string(), command.to_string()]);
    format!("{}\n```md\n{}\n```", i18n.get("helpUsage"), body)
}

use std::collections::HashMap;

const JA: &[(&str, &str)] = &[
    ("replayEmpty", "❌ 再生中の曲もキューもありません"),
    ("replayTrackNotFound", "❌ 再生中の曲が見つかりませんでした"),
    ("replaySuccess", "🔁 {0} 曲をもう一度キューの先頭に追加しました: **{1}**"),
    ("replayDenied", "⛔ 他のユーザーがリクエストした曲はリプレイできません"),
    (
        "replayDeniedTooManyTracks",
        "⛔ 他のユーザーがリクエストした曲が {0} 件含まれているためリプレイできません",
    ),
    ("helpUsage", "使い方:"),
    ("helpReplayCommand", "再生中の曲をもう一度キューの先頭に追加します。"),
];

const EN: &[(&str, &str)] = &[
    ("replayEmpty", "❌ There is nothing playing and the queue is empty."),
    ("replayTrackNotFound", "❌ Couldn't find the track that is playing."),
    ("replaySuccess", "🔁 Replaying {0} track(s): **{1}**"),
    ("replayDenied", "⛔ You can't replay a track that someone else requested."),
    (
        "replayDeniedTooManyTracks",
        "⛔ You can't replay these tracks: {0} of them were requested by someone else.",
    ),
    ("helpUsage", "Usage:"),
    ("helpReplayCommand", "Add the track that is playing to the front of the queue again."),
];

/// ロケール別のメッセージ表。未知のキーはキー文字列をそのまま返す。
#[derive(Debug, Clone)]
pub struct I18n {
    table: HashMap<String, String>,
}

impl Default for I18n {
    fn default() -> Self {
        Self::new("ja", HashMap::new())
    }
}

impl I18n {
    /// `overrides` は設定ファイルの [messages] をそのまま渡す
    pub fn new(locale: &str, overrides: HashMap<String, String>) -> Self {
        let base = match locale {
            "en" => EN,
            other => {
                if other != "ja" {
                    tracing::warn!(locale = other, "unknown locale; falling back to ja");
                }
                JA
            }
        };
        let mut table: HashMap<String, String> = base
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        table.extend(overrides);
        Self { table }
    }

    pub fn get(&self, key: &str) -> String {
        self.table
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// `{0}`, `{1}` ... を引数で置き換える
    pub fn format(&self, key: &str, args: &[String]) -> String {
        format_placeholders(&self.get(key), args)
    }
}

/// テンプレートを 1 回だけ走査するので、引数に `{1}` が含まれていても再置換されない
pub fn format_placeholders(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let arg = after
            .find('}')
            .and_then(|close| after[..close].parse::<usize>().ok().map(|i| (i, close)))
            .and_then(|(i, close)| args.get(i).map(|a| (a, close)));
        match arg {
            Some((a, close)) => {
                out.push_str(a);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

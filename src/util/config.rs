use std::{collections::HashMap, path::Path};

use serde::Deserialize;

use crate::util::alias::Error;

/// Setting.toml の中身
#[derive(Deserialize, Debug)]
pub struct BotSettings {
    pub token: Tokens,
    #[serde(default)]
    pub bot: BotSection,
    /// ロケール表の上書き（キー → 文言）
    #[serde(default)]
    pub messages: HashMap<String, String>,
}

#[derive(Deserialize, Debug)]
pub struct Tokens {
    pub token: String,
}

#[derive(Deserialize, Debug)]
pub struct BotSection {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_locale")]
    pub locale: String,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            locale: default_locale(),
        }
    }
}

fn default_prefix() -> String {
    "s!".into()
}

fn default_locale() -> String {
    "ja".into()
}

impl BotSettings {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("設定ファイルの読み込みに失敗しました ({}): {e}", path.display()))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Error> {
        let settings: Self =
            toml::from_str(contents).map_err(|e| format!("設定ファイルのパースに失敗しました: {e}"))?;
        Ok(settings)
    }
}

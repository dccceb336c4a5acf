use poise::serenity_prelude::UserId;
use songbird::input::{AuxMetadata, Compose, YoutubeDl};
use url::Url;
use uuid::Uuid;

use crate::util::{alias::Error, play::get_http_client};

pub fn is_youtube(u: &str) -> bool {
    u.contains("youtube.com") || u.contains("youtu.be")
}

#[derive(Clone, Debug)]
pub struct TrackRequest {
    /// songbird の TrackHandle::uuid() と一致させる
    pub id: Uuid,
    pub url: String,
    pub requested_by: UserId,
    pub meta: AuxMetadata,
}

impl TrackRequest {
    /// メタ情報は未取得の「プレースホルダ」
    pub fn new(url: String, requested_by: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            url,
            requested_by,
            meta: AuxMetadata::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.meta.title = Some(title.into());
        self
    }

    /// 表示用タイトル。メタデータが無ければ URL。
    pub fn effective_title(&self) -> &str {
        self.meta.title.as_deref().unwrap_or(&self.url)
    }

    /// リプレイ用の複製。ID だけ振り直し、リクエスト者は元のまま。
    pub fn requeued(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            ..self.clone()
        }
    }

    #[tracing::instrument(
        name = "TrackRequest::from_url",
        level = "info",
        skip_all,
        fields(raw = %raw, requested_by = %requested_by)
    )]
    pub async fn from_url(raw: String, requested_by: UserId) -> Result<Self, Error> {
        let parsed = Url::parse(&raw).ok();

        // 非YouTubeのURLはメタデータ取得しない
        if let Some(ref url) = parsed {
            if !is_youtube(url.as_str()) {
                tracing::info!(%url, "non-YouTube URL; skip metadata");
                return Ok(Self::new(raw, requested_by));
            }
        }

        let mut ytdl = if parsed.is_some() {
            YoutubeDl::new(get_http_client(), raw.clone())
        } else {
            YoutubeDl::new_search(get_http_client(), raw.clone())
        };

        let meta = ytdl
            .aux_metadata()
            .await
            .map_err(|e| format!("❌ メタデータが取得できませんでした: {e}"))?;

        let url = meta.source_url.clone().unwrap_or(raw);
        tracing::info!(
            %url,
            title = meta.title.as_deref().unwrap_or(""),
            "metadata obtained"
        );

        Ok(Self {
            id: Uuid::new_v4(),
            url,
            requested_by,
            meta,
        })
    }
}

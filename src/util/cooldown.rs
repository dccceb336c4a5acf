use dashmap::{DashMap, mapref::entry::Entry};
use poise::serenity_prelude::GuildId;

/// 同一ギルドでの連打を抑止する待機時間（ミリ秒）
pub const COOLDOWN_WINDOW_MS: i64 = 500;

/// ギルドごとの「最後に受理した呼び出し」の時刻を保持する。
///
/// 時刻は epoch からのミリ秒。記録が無いギルドは 0 とみなすので、初回の呼び出しは常に受理される。
#[derive(Debug)]
pub struct CooldownGate {
    last_accepted: DashMap<GuildId, i64>,
    window_ms: i64,
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::with_window_ms(COOLDOWN_WINDOW_MS)
    }
}

impl CooldownGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window_ms(window_ms: i64) -> Self {
        Self {
            last_accepted: DashMap::new(),
            window_ms,
        }
    }

    fn within_window(&self, last: i64, now: i64) -> bool {
        now - last <= self.window_ms
    }

    /// `now - 最終受理時刻 <= window` なら true
    pub fn is_on_cooldown(&self, guild_id: GuildId, now: i64) -> bool {
        let last = self.last_accepted.get(&guild_id).map(|t| *t).unwrap_or(0);
        self.within_window(last, now)
    }

    /// 受理時刻を記録する。時計が巻き戻っても記録値は減らない。
    pub fn record_invocation(&self, guild_id: GuildId, now: i64) {
        self.last_accepted
            .entry(guild_id)
            .and_modify(|t| *t = (*t).max(now))
            .or_insert(now);
    }

    /// 判定と記録を同じシャードロック内で行う。
    ///
    /// `is_on_cooldown` → `record_invocation` を別々に呼ぶと、同じギルドの同時実行が
    /// 両方とも受理されうる。こちらはウィンドウ内の同時呼び出しのうち 1 件だけを通す。
    pub fn try_admit(&self, guild_id: GuildId, now: i64) -> bool {
        match self.last_accepted.entry(guild_id) {
            Entry::Occupied(mut e) => {
                let last = *e.get();
                if self.within_window(last, now) {
                    return false;
                }
                *e.get_mut() = last.max(now);
                true
            }
            Entry::Vacant(v) => {
                if self.within_window(0, now) {
                    return false;
                }
                v.insert(now);
                true
            }
        }
    }

    /// ウィンドウを過ぎた記録を捨てる。期限切れと未記録は同じ判定になるので挙動は変わらない。
    pub fn prune(&self, now: i64) -> usize {
        let before = self.last_accepted.len();
        self.last_accepted
            .retain(|_, last| now - *last <= self.window_ms);
        before - self.last_accepted.len()
    }

    pub fn len(&self) -> usize {
        self.last_accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_accepted.is_empty()
    }

    pub fn last_accepted(&self, guild_id: GuildId) -> Option<i64> {
        self.last_accepted.get(&guild_id).map(|t| *t)
    }
}

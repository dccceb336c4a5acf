use poise::serenity_prelude::{Permissions, UserId};

use crate::util::alias::{Context, Error};

/// 権限レベル。上のものほど強い。
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PermissionLevel {
    Base,
    User,
    Dj,
    Admin,
}

/// コマンドを実行したユーザー
#[derive(Clone, Debug)]
pub struct Actor {
    pub user_id: UserId,
    pub level: PermissionLevel,
}

impl Actor {
    pub fn new(user_id: UserId, level: PermissionLevel) -> Self {
        Self { user_id, level }
    }

    pub fn is_privileged(&self) -> bool {
        self.level >= PermissionLevel::Dj
    }
}

const DJ_ROLE_NAME: &str = "DJ";

pub fn level_from(perms: Permissions, has_dj_role: bool) -> PermissionLevel {
    if perms.administrator() || perms.manage_guild() {
        PermissionLevel::Admin
    } else if has_dj_role {
        PermissionLevel::Dj
    } else {
        PermissionLevel::User
    }
}

/// 実行者のギルド内での権限レベルを求める（DM など member が無い場合は Base）
pub async fn resolve_level(ctx: Context<'_>) -> PermissionLevel {
    let Some(member) = ctx.author_member().await else {
        return PermissionLevel::Base;
    };
    let Some(guild) = ctx.guild() else {
        return PermissionLevel::User;
    };
    let has_dj_role = member.roles.iter().any(|rid| {
        guild
            .roles
            .get(rid)
            .is_some_and(|r| r.name.eq_ignore_ascii_case(DJ_ROLE_NAME))
    });
    level_from(guild.member_permissions(&member), has_dj_role)
}

pub async fn resolve_actor(ctx: Context<'_>) -> Actor {
    Actor::new(ctx.author().id, resolve_level(ctx).await)
}

/// poise の check 用。`User` 以上でなければ実行させない。
pub async fn require_user(ctx: Context<'_>) -> Result<bool, Error> {
    let level = resolve_level(ctx).await;
    if level < PermissionLevel::User {
        tracing::info!(user = %ctx.author().id, ?level, "command rejected by permission check");
        return Ok(false);
    }
    Ok(true)
}

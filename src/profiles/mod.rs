mod page;

use axum::{routing::{get, post}, Router};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::{aura::ActivityStats, include_res, model::{Profile, AVATARS}, res::escape, store::Store, AppError, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(page::own_profile))
        .route("/me/avatar", post(page::choose_avatar))
        .route("/{id}", get(page::profile))
}

/// Adjusts a member's activity counters. Gone members are skipped.
pub async fn bump_stats(
    store: &Store,
    user_id: Uuid,
    change: impl FnOnce(&mut ActivityStats) + Send,
) -> AppResult<()> {
    let Some(mut profile) = store.profiles().get(user_id).await? else {
        debug!("no profile {user_id} to count activity for");
        return Ok(());
    };

    change(&mut profile.stats);
    store.profiles().put(&profile).await
}

pub(crate) fn step(count: &mut u32, up: bool) {
    *count = if up { count.saturating_add(1) } else { count.saturating_sub(1) };
}

pub async fn set_avatar(store: &Store, mut profile: Profile, avatar: &str) -> AppResult<Profile> {
    if !AVATARS.contains(&avatar) {
        return Err(AppError::invalid("Pick one of the avatars shown."));
    }

    profile.avatar = Some(avatar.to_owned());
    store.profiles().put(&profile).await?;
    Ok(profile)
}

/// The round picture: the chosen avatar, or initials without one.
pub(crate) fn avatar(profile: &Profile) -> String {
    match &profile.avatar {
        Some(avatar) => escape(avatar),
        None => escape(&profile.initials()),
    }
}

/// One line in a list of people.
pub(crate) fn profile_item(profile: &Profile, now: OffsetDateTime) -> String {
    let badge = profile.badge(now);
    include_res!(str, "/pages/profile_item.html")
        .replace("{id}", &profile.id.to_string())
        .replace("{avatar}", &avatar(profile))
        .replace("{full_name}", &escape(&profile.full_name))
        .replace("{role}", profile.role.label())
        .replace("{affiliation}", &escape(&profile.affiliation()))
        .replace("{badge}", &format!("{} {}", badge.icon(), badge.label()))
        .replace("{aura}", &profile.aura().to_string())
}

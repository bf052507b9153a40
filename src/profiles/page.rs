use axum::{debug_handler, extract::{Path, State}, response::{Html, IntoResponse, Redirect, Response}, Form};
use serde::Deserialize;
use time::{macros::format_description, OffsetDateTime};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{connections, include_res, model::{Profile, AVATARS}, res::escape, session::{conclude, take_notice, CurrentUser, Notice}, store::Store, AppError, AppResult, AppState};

use super::{avatar, set_avatar};

fn alumni_details(profile: &Profile) -> String {
    let Some(details) = profile.role.alumni() else {
        return String::new();
    };

    let mut html = format!("<li><strong>Class of</strong> {}</li>", details.year_of_passing);
    if let Some(placement) = &details.placement {
        html += &format!("<li><strong>Works at</strong> {}</li>", escape(&placement.company));
        if let Some(role_description) = &placement.role_description {
            html += &format!("<li><strong>Role</strong> {}</li>", escape(role_description));
        }
    }
    html
}

fn avatar_picker(profile: &Profile) -> String {
    let choices: String = AVATARS
        .iter()
        .map(|choice| {
            let current = if profile.avatar.as_deref() == Some(*choice) { " class=\"current\"" } else { "" };
            format!("<button name=\"avatar\" value=\"{choice}\"{current}>{choice}</button>")
        })
        .collect();

    format!(
        "<details><summary>Choose Your Avatar</summary>\
         <form method=\"post\" action=\"/p/me/avatar\" class=\"avatars\">{choices}</form></details>"
    )
}

async fn render(store: &Store, profile: &Profile, viewer: &Profile, session: &Session) -> AppResult<Response> {
    let now = OffsetDateTime::now_utc();
    let badge = profile.badge(now);
    let connection = connections::between(store, viewer.id, profile.id).await?;
    let joined = profile.created_at.format(format_description!("[month repr:long] [year]"))?;

    let own = viewer.id == profile.id;

    Ok(Html(
        include_res!(str, "/pages/profile.html")
        .replace("{notice}", &take_notice(session).await?)
        .replace("{id}", &profile.id.to_string())
        .replace("{avatar}", &avatar(profile))
        .replace("{avatar_picker}", &if own { avatar_picker(profile) } else { String::new() })
        .replace("{full_name}", &escape(&profile.full_name))
        .replace("{role}", profile.role.label())
        .replace("{badge_icon}", badge.icon())
        .replace("{badge}", badge.label())
        .replace("{aura}", &profile.aura().to_string())
        .replace("{affiliation}", &escape(&profile.affiliation()))
        .replace("{college}", &escape(&profile.college))
        .replace("{branch}", &escape(&profile.branch))
        .replace("{joined}", &joined)
        .replace("{alumni_details}", &alumni_details(profile))
        .replace("{posts}", &profile.stats.posts.to_string())
        .replace("{votes}", &profile.stats.votes.to_string())
        .replace("{comments}", &profile.stats.comments.to_string())
        .replace("{messages}", &profile.stats.messages.to_string())
        .replace("{connections}", &connections::count_accepted(store, profile.id).await?.to_string())
        .replace("{connect}", &connections::button(viewer.id, profile.id, connection.as_ref()))
    ).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn profile(
    Path(profile_id): Path<Uuid>,
    CurrentUser(viewer): CurrentUser,
    State(store): State<Store>,
    session: Session,
) -> AppResult<Response> {
    let Some(profile) = store.profiles().get(profile_id).await? else {
        return Err(AppError::not_found("profile"));
    };

    render(&store, &profile, &viewer, &session).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn own_profile(
    CurrentUser(user): CurrentUser,
    State(store): State<Store>,
    session: Session,
) -> AppResult<Response> {
    render(&store, &user, &user, &session).await
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AvatarForm {
    avatar: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn choose_avatar(
    CurrentUser(user): CurrentUser,
    State(store): State<Store>,
    session: Session,
    Form(AvatarForm { avatar }): Form<AvatarForm>,
) -> AppResult<Redirect> {
    let result = set_avatar(&store, user, &avatar).await.map(|_| (
        Notice::success("Avatar updated", "Your new avatar is on your profile."),
        "/p/me".to_owned(),
    ));

    conclude(&session, "/p/me", result).await
}

use axum::{debug_handler, extract::{Query, State}, response::{Html, IntoResponse, Response}};
use serde::Deserialize;
use time::OffsetDateTime;
use tower_sessions::Session;

use crate::{connections, include_res, model::{Profile, RoleKind}, profiles::{self, profile_item}, res::escape, session::{take_notice, MaybeUser}, store::{PostOrder, ProfileFilter, ProfileOrder, Store}, AppResult, AppState};

use super::{list_feed, post_item};

/// Dashboard tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Global,
    /// Posts tagged with the viewer's own branch.
    Branch,
    Doubts,
}

impl Tab {
    pub fn parse(s: &str) -> Option<Tab> {
        match s {
            "global" => Some(Tab::Global),
            "branch" => Some(Tab::Branch),
            "doubts" => Some(Tab::Doubts),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Tab::Global => "global",
            Tab::Branch => "branch",
            Tab::Doubts => "doubts",
        }
    }

    /// Kind of post written from this tab.
    fn post_kind(&self) -> &'static str {
        match self {
            Tab::Global => "global",
            Tab::Branch => "branch",
            Tab::Doubts => "doubt",
        }
    }

    fn heading(&self, viewer: &Profile) -> String {
        match self {
            Tab::Global => "Share with Global Community".to_owned(),
            Tab::Branch => format!("Share with {}", escape(&viewer.branch)),
            Tab::Doubts => "Ask a Question".to_owned(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FeedQuery {
    tab: Option<String>,
    sort: Option<String>,
}

pub const SUGGESTED_ALUMNI: usize = 3;

/// Alumni of the viewer's branch, most active first.
pub async fn suggested_alumni(store: &Store, viewer: &Profile) -> AppResult<Vec<Profile>> {
    store
        .profiles()
        .list(&ProfileFilter {
            role: Some(RoleKind::Alumni),
            branch: Some(viewer.branch.clone()),
            exclude: Some(viewer.id),
            order: ProfileOrder::Aura,
            limit: Some(SUGGESTED_ALUMNI),
            ..Default::default()
        })
        .await
}

#[debug_handler(state = AppState)]
pub(crate) async fn index(
    MaybeUser(user): MaybeUser,
    State(store): State<Store>,
    Query(FeedQuery { tab, sort }): Query<FeedQuery>,
    session: Session,
) -> AppResult<Response> {
    let now = OffsetDateTime::now_utc();
    let notice = take_notice(&session).await?;

    let Some(user) = user else {
        return landing(&store, &notice, now).await;
    };

    let tab = tab.as_deref().and_then(Tab::parse).unwrap_or_default();
    let order = match sort.as_deref() {
        Some("top") => PostOrder::Top,
        _ => PostOrder::Recent,
    };
    let return_url = format!("/?tab={}&sort={}", tab.key(), if order == PostOrder::Top { "top" } else { "recent" });

    let mut posts = String::new();
    for post in list_feed(&store, &user, tab, order).await? {
        posts += &post_item(&store, &post, &user, &return_url, now).await?;
    }
    if posts.is_empty() {
        posts = "<p class=\"empty\">No posts yet. Be the first to share something!</p>".to_owned();
    }

    let suggested: String = suggested_alumni(&store, &user)
        .await?
        .iter()
        .map(|alumni| profile_item(alumni, now))
        .collect();

    let requests: String = connections::pending_for(&store, user.id)
        .await?
        .iter()
        .map(|(connection, requester)| connections::request_item(connection, requester, now))
        .collect();

    let selected = |on: bool| if on { "selected" } else { "" };

    Ok(Html(
        include_res!(str, "/pages/index.html")
        .replace("{notice}", &notice)
        .replace("{user_id}", &user.id.to_string())
        .replace("{avatar}", &profiles::avatar(&user))
        .replace("{full_name}", &escape(&user.full_name))
        .replace("{aura}", &user.aura().to_string())
        .replace("{global_class}", selected(tab == Tab::Global))
        .replace("{branch_class}", selected(tab == Tab::Branch))
        .replace("{doubts_class}", selected(tab == Tab::Doubts))
        .replace("{recent_class}", selected(order == PostOrder::Recent))
        .replace("{top_class}", selected(order == PostOrder::Top))
        .replace("{tab}", tab.key())
        .replace("{heading}", &tab.heading(&user))
        .replace("{kind}", tab.post_kind())
        .replace("{suggested}", &suggested)
        .replace("{requests}", &requests)
        .replace("{posts}", &posts)
    ).into_response())
}

pub const FEATURED_ALUMNI: usize = 6;

async fn landing(store: &Store, notice: &str, now: OffsetDateTime) -> AppResult<Response> {
    let alumni: String = store
        .profiles()
        .list(&ProfileFilter {
            role: Some(RoleKind::Alumni),
            order: ProfileOrder::Newest,
            limit: Some(FEATURED_ALUMNI),
            ..Default::default()
        })
        .await?
        .iter()
        .map(|alumni| profile_item(alumni, now))
        .collect();

    Ok(Html(
        include_res!(str, "/pages/landing.html")
        .replace("{notice}", notice)
        .replace("{alumni}", &alumni)
    ).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tabs_are_not_parsed() {
        assert_eq!(Tab::parse("branch"), Some(Tab::Branch));
        assert_eq!(Tab::parse("doubts"), Some(Tab::Doubts));
        assert_eq!(Tab::parse("secret"), None);
        assert_eq!(Tab::Doubts.post_kind(), "doubt");
    }
}

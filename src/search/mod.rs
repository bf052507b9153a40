use axum::{debug_handler, extract::{Query, State}, response::{Html, IntoResponse, Response}, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{include_res, model::Profile, profiles::profile_item, res::escape, session::CurrentUser, store::{ProfileFilter, ProfileOrder, Store}, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search_page))
        .route("/search.json", get(search_json))
}

pub const MIN_QUERY_LEN: usize = 2;
pub const MAX_RESULTS: usize = 5;

/// Members whose name contains `query`, most active first. Short queries find nobody.
pub async fn search_profiles(store: &Store, query: &str) -> AppResult<Vec<Profile>> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_LEN {
        return Ok(Vec::new());
    }

    store
        .profiles()
        .list(&ProfileFilter {
            name_like: Some(query.to_owned()),
            order: ProfileOrder::Aura,
            limit: Some(MAX_RESULTS),
            ..Default::default()
        })
        .await
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    q: String,
}

/// What the search box shows per hit.
#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub id: Uuid,
    pub full_name: String,
    pub initials: String,
    pub avatar: Option<String>,
    pub role: &'static str,
    pub affiliation: String,
    pub aura: u64,
}

impl From<Profile> for SearchHit {
    fn from(profile: Profile) -> SearchHit {
        SearchHit {
            id: profile.id,
            initials: profile.initials(),
            role: profile.role.kind().as_str(),
            affiliation: profile.affiliation(),
            aura: profile.aura(),
            full_name: profile.full_name,
            avatar: profile.avatar,
        }
    }
}

#[debug_handler(state = AppState)]
async fn search_page(
    CurrentUser(_): CurrentUser,
    State(store): State<Store>,
    Query(SearchQuery { q }): Query<SearchQuery>,
) -> AppResult<Response> {
    let now = OffsetDateTime::now_utc();
    let hits = search_profiles(&store, &q).await?;

    let results = if q.trim().chars().count() < MIN_QUERY_LEN {
        String::new()
    } else if hits.is_empty() {
        format!("<p class=\"empty\">No one found for \u{201c}{}\u{201d}.</p>", escape(q.trim()))
    } else {
        hits.iter().map(|profile| profile_item(profile, now)).collect()
    };

    Ok(Html(
        include_res!(str, "/pages/search.html")
        .replace("{q}", &escape(&q))
        .replace("{results}", &results)
    ).into_response())
}

#[debug_handler(state = AppState)]
async fn search_json(
    CurrentUser(_): CurrentUser,
    State(store): State<Store>,
    Query(SearchQuery { q }): Query<SearchQuery>,
) -> AppResult<Json<Vec<SearchHit>>> {
    let hits = search_profiles(&store, &q).await?;
    Ok(Json(hits.into_iter().map(SearchHit::from).collect()))
}

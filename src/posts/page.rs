use axum::{debug_handler, extract::{Path, State}, response::{Html, IntoResponse, Redirect, Response}, Form};
use serde::Deserialize;
use time::OffsetDateTime;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{changes::ChangeFeed, comments, include_res, res::escape, session::{conclude, take_notice, CurrentUser, Notice}, store::Store, AppError, AppResult, AppState};

use super::{create_post, delete_post, edit_post, own_post, post_item, CounterLock, PostForm};

#[derive(Deserialize)]
pub(crate) struct NewPostForm {
    #[serde(flatten)]
    post: PostForm,
    #[serde(default)]
    tab: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn create(
    CurrentUser(user): CurrentUser,
    State(store): State<Store>,
    session: Session,
    Form(NewPostForm { post, tab }): Form<NewPostForm>,
) -> AppResult<Redirect> {
    let back = match super::Tab::parse(&tab) {
        Some(tab) => format!("/?tab={}", tab.key()),
        None => "/".to_owned(),
    };

    let result = create_post(&store, &user, &post, OffsetDateTime::now_utc())
        .await
        .map(|_| (
            Notice::success("Post Created!", "Your post has been shared with the community."),
            back.clone(),
        ));

    conclude(&session, &back, result).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn post_page(
    Path(post_id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
    State(store): State<Store>,
    session: Session,
) -> AppResult<Response> {
    let Some(post) = store.posts().get(post_id).await? else {
        return Err(AppError::not_found("post"));
    };
    let now = OffsetDateTime::now_utc();
    let here = format!("/posts/{post_id}");

    Ok(Html(
        include_res!(str, "/pages/post.html")
        .replace("{notice}", &take_notice(&session).await?)
        .replace("{id}", &post.id.to_string())
        .replace("{comments}", &comments::render(&store, post.id, &user, now).await?)
        .replace("{post}", &post_item(&store, &post, &user, &here, now).await?)
    ).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn edit_page(
    Path(post_id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
    State(store): State<Store>,
    session: Session,
) -> AppResult<Response> {
    let post = own_post(&store, &user, post_id).await?;

    Ok(Html(
        include_res!(str, "/pages/edit_post.html")
        .replace("{notice}", &take_notice(&session).await?)
        .replace("{id}", &post.id.to_string())
        .replace("{title}", &escape(post.title.as_deref().unwrap_or_default()))
        .replace("{image}", &escape(post.image.as_deref().unwrap_or_default()))
        .replace("{body}", &escape(&post.body))
    ).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn edit(
    Path(post_id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
    State(store): State<Store>,
    session: Session,
    Form(form): Form<PostForm>,
) -> AppResult<Redirect> {
    let result = edit_post(&store, &user, post_id, &form).await.map(|post| (
        Notice::success("Post updated", "Your changes have been saved."),
        format!("/posts/{}", post.id),
    ));

    conclude(&session, &format!("/posts/{post_id}/edit"), result).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete(
    Path(post_id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
    State(store): State<Store>,
    State(lock): State<CounterLock>,
    State(changes): State<ChangeFeed>,
    session: Session,
) -> AppResult<Redirect> {
    let result = delete_post(&store, &lock, &changes, &user, post_id).await.map(|()| (
        Notice::success("Post deleted", "Your post has been removed."),
        "/".to_owned(),
    ));

    conclude(&session, "/", result).await
}

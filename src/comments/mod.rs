mod ws;

use std::collections::HashMap;

use axum::{debug_handler, extract::{Path, State}, response::{Html, Redirect}, routing::{get, post}, Form, Json, Router};
use serde::Deserialize;
use time::OffsetDateTime;
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

use crate::{changes::ChangeFeed, include_res, model::{Comment, Profile}, posts::CounterLock, profiles::{self, bump_stats, step}, res::escape, session::{conclude, CurrentUser, Notice}, store::{CommentFilter, Store}, threads::{self, Thread}, AppError, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/comments", get(tree).post(add))
        .route("/posts/{id}/comments/html", get(threads_html))
        .route("/posts/{id}/comments/ws", get(ws::comments_ws))
        .route("/comments/{id}/delete", post(delete))
}

/// The post's comments as root threads, always built from everything stored.
pub async fn comment_tree(store: &Store, post_id: Uuid) -> AppResult<Vec<Thread>> {
    let comments = store.comments().list(&CommentFilter::for_post(post_id)).await?;
    Ok(threads::build(comments))
}

async fn change_count(store: &Store, post_id: Uuid, up: bool) -> AppResult<()> {
    if let Some(mut post) = store.posts().get(post_id).await? {
        step(&mut post.comment_count, up);
        store.posts().put(&post).await?;
    }
    Ok(())
}

/// Adds a comment, or a reply when `parent_id` names a top-level comment on the same post.
#[allow(clippy::too_many_arguments)]
pub async fn add_comment(
    store: &Store,
    lock: &CounterLock,
    changes: &ChangeFeed,
    author: &Profile,
    post_id: Uuid,
    body: &str,
    parent_id: Option<Uuid>,
    now: OffsetDateTime,
) -> AppResult<Comment> {
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::invalid("Please write something first."));
    }

    let _guard = lock.hold().await;
    if store.posts().get(post_id).await?.is_none() {
        return Err(AppError::not_found("post"));
    }
    if let Some(parent_id) = parent_id {
        match store.comments().get(parent_id).await? {
            Some(parent) if parent.post_id == post_id => {
                if !parent.is_root() {
                    return Err(AppError::invalid("Replies go under top-level comments."));
                }
            }
            _ => return Err(AppError::not_found("comment")),
        }
    }

    let comment = Comment::new(post_id, author.id, body.to_owned(), parent_id, now);
    store.comments().put(&comment).await?;
    change_count(store, post_id, true).await?;
    bump_stats(store, author.id, |stats| step(&mut stats.comments, true)).await?;

    changes.notify(post_id);
    info!("{} commented {} on {post_id}", author.id, comment.id);
    Ok(comment)
}

/// Deletes one of the user's own comments. Its replies stay stored but drop out of the tree.
pub async fn delete_comment(
    store: &Store,
    lock: &CounterLock,
    changes: &ChangeFeed,
    user: &Profile,
    comment_id: Uuid,
) -> AppResult<Comment> {
    let _guard = lock.hold().await;
    let Some(comment) = store.comments().get(comment_id).await? else {
        return Err(AppError::not_found("comment"));
    };
    if comment.author_id != user.id {
        return Err(AppError::Forbidden("You can only delete your own comments.".to_owned()));
    }

    store.comments().delete(comment.id).await?;
    change_count(store, comment.post_id, false).await?;
    bump_stats(store, user.id, |stats| step(&mut stats.comments, false)).await?;

    changes.notify(comment.post_id);
    Ok(comment)
}

async fn authors(store: &Store, tree: &[Thread]) -> AppResult<HashMap<Uuid, Profile>> {
    let mut authors = HashMap::new();
    for comment in threads::flatten(tree) {
        if authors.contains_key(&comment.author_id) {
            continue;
        }
        if let Some(author) = store.profiles().get(comment.author_id).await? {
            authors.insert(author.id, author);
        }
    }
    Ok(authors)
}

fn comment_html(
    template: &str,
    comment: &Comment,
    authors: &HashMap<Uuid, Profile>,
    viewer: &Profile,
    now: OffsetDateTime,
) -> String {
    let author = authors.get(&comment.author_id);
    let delete = if comment.author_id == viewer.id {
        format!(
            "<form method=\"post\" action=\"/comments/{}/delete\"><button class=\"link danger\">Delete</button></form>",
            comment.id
        )
    } else {
        String::new()
    };

    template
        .replace("{id}", &comment.id.to_string())
        .replace("{post_id}", &comment.post_id.to_string())
        .replace("{author_id}", &comment.author_id.to_string())
        .replace("{avatar}", &author.map(profiles::avatar).unwrap_or("?".to_owned()))
        .replace("{author_name}", &author.map(|a| escape(&a.full_name)).unwrap_or("Former member".to_owned()))
        .replace("{role}", author.map(|a| a.role.label()).unwrap_or_default())
        .replace("{time_ago}", &crate::display::time_ago(comment.created_at, now))
        .replace("{delete}", &delete)
        .replace("{body}", &escape(&comment.body))
}

/// The post's threads as HTML for `viewer`.
pub(crate) async fn render(store: &Store, post_id: Uuid, viewer: &Profile, now: OffsetDateTime) -> AppResult<String> {
    let threads = comment_tree(store, post_id).await?;
    if threads.is_empty() {
        return Ok("<p class=\"empty\">No comments yet. Start the conversation!</p>".to_owned());
    }
    let authors = authors(store, &threads).await?;

    let mut html = String::new();
    for thread in &threads {
        let replies: String = thread
            .replies
            .iter()
            .map(|reply| comment_html(include_res!(str, "/pages/reply_item.html"), reply, &authors, viewer, now))
            .collect();

        html += &comment_html(include_res!(str, "/pages/comment_item.html"), &thread.comment, &authors, viewer, now)
            .replace("{replies}", &replies);
    }
    Ok(html)
}

#[debug_handler(state = AppState)]
async fn tree(
    Path(post_id): Path<Uuid>,
    CurrentUser(_): CurrentUser,
    State(store): State<Store>,
) -> AppResult<Json<Vec<Thread>>> {
    if store.posts().get(post_id).await?.is_none() {
        return Err(AppError::not_found("post"));
    }
    Ok(Json(comment_tree(&store, post_id).await?))
}

/// Just the threads, for the post page to swap in after a change. Leaves pending notices alone.
#[debug_handler(state = AppState)]
async fn threads_html(
    Path(post_id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
    State(store): State<Store>,
) -> AppResult<Html<String>> {
    if store.posts().get(post_id).await?.is_none() {
        return Err(AppError::not_found("post"));
    }
    Ok(Html(render(&store, post_id, &user, OffsetDateTime::now_utc()).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CommentForm {
    body: String,
    /// Empty for a top-level comment.
    parent_id: String,
}

#[debug_handler(state = AppState)]
async fn add(
    Path(post_id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
    State(store): State<Store>,
    State(lock): State<CounterLock>,
    State(changes): State<ChangeFeed>,
    session: Session,
    Form(CommentForm { body, parent_id }): Form<CommentForm>,
) -> AppResult<Redirect> {
    let back = format!("/posts/{post_id}");
    let result = async {
        let parent_id = match parent_id.trim() {
            "" => None,
            id => Some(Uuid::parse_str(id).map_err(|_| AppError::not_found("comment"))?),
        };
        let comment = add_comment(&store, &lock, &changes, &user, post_id, &body, parent_id, OffsetDateTime::now_utc()).await?;

        let notice = if comment.is_root() {
            Notice::success("Comment posted", "Your comment has been added successfully.")
        } else {
            Notice::success("Reply posted", "Your reply has been added successfully.")
        };
        Ok::<_, AppError>((notice, format!("{back}#comment-{}", comment.id)))
    }.await;

    conclude(&session, &back, result).await
}

#[debug_handler(state = AppState)]
async fn delete(
    Path(comment_id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
    State(store): State<Store>,
    State(lock): State<CounterLock>,
    State(changes): State<ChangeFeed>,
    session: Session,
) -> AppResult<Redirect> {
    let result = delete_comment(&store, &lock, &changes, &user, comment_id).await.map(|comment| (
        Notice::success("Comment deleted", "Your comment has been removed."),
        format!("/posts/{}", comment.post_id),
    ));

    conclude(&session, "/", result).await
}

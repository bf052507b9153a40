mod feed;
mod page;
mod vote;

use axum::{routing::{get, post}, Router};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{changes::ChangeFeed, include_res, model::{Post, PostKind, Profile}, profiles::{self, bump_stats, step}, res::{escape, markdown}, store::{CommentFilter, PostFilter, PostOrder, Store, VoteFilter}, votes::VoteKind, AppError, AppResult, AppState};

pub use feed::{suggested_alumni, Tab};
pub use vote::{cast_vote, CounterLock};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(feed::index))
        .route("/posts", post(page::create))
        .route("/posts/{id}", get(page::post_page))
        .route("/posts/{id}/edit", get(page::edit_page).post(page::edit))
        .route("/posts/{id}/delete", post(page::delete))
        .route("/posts/{id}/vote", post(vote::vote))
}

pub const FEED_LIMIT: usize = 50;

/// A new or edited post as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub kind: String,
    pub title: String,
    pub body: String,
    pub image: String,
}

fn optional(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_owned())
}

impl PostForm {
    /// Title, body and image, checked.
    fn content(&self) -> AppResult<(Option<String>, String, Option<String>)> {
        let Some(body) = optional(&self.body) else {
            return Err(AppError::invalid("Please add some content to your post."));
        };

        let image = optional(&self.image);
        if let Some(image) = &image {
            if !(image.starts_with("https://") || image.starts_with("http://")) {
                return Err(AppError::invalid("Images are linked by their http(s) address."));
            }
        }

        Ok((optional(&self.title), body, image))
    }
}

pub async fn create_post(store: &Store, author: &Profile, form: &PostForm, now: OffsetDateTime) -> AppResult<Post> {
    let kind = PostKind::parse(form.kind.trim()).unwrap_or(PostKind::Global);
    let (title, body, image) = form.content()?;

    let post = Post::new(author, kind, title, body, image, now);
    store.posts().put(&post).await?;
    bump_stats(store, author.id, |stats| step(&mut stats.posts, true)).await?;

    info!("{} posted {} ({})", author.id, post.id, kind.as_str());
    Ok(post)
}

async fn own_post(store: &Store, user: &Profile, post_id: Uuid) -> AppResult<Post> {
    let Some(post) = store.posts().get(post_id).await? else {
        return Err(AppError::not_found("post"));
    };
    if post.author_id != user.id {
        return Err(AppError::Forbidden("Only the author can change this post.".to_owned()));
    }
    Ok(post)
}

/// Replaces the text of the post. Kind, branch and counters stay.
pub async fn edit_post(store: &Store, user: &Profile, post_id: Uuid, form: &PostForm) -> AppResult<Post> {
    let mut post = own_post(store, user, post_id).await?;
    (post.title, post.body, post.image) = form.content()?;
    store.posts().put(&post).await?;
    Ok(post)
}

/// Removes the post with its comments and votes, taking back the activity they counted.
pub async fn delete_post(
    store: &Store,
    lock: &CounterLock,
    changes: &ChangeFeed,
    user: &Profile,
    post_id: Uuid,
) -> AppResult<()> {
    let _guard = lock.hold().await;
    let post = own_post(store, user, post_id).await?;

    for comment in store.comments().list(&CommentFilter::for_post(post.id)).await? {
        store.comments().delete(comment.id).await?;
        bump_stats(store, comment.author_id, |stats| step(&mut stats.comments, false)).await?;
    }
    let votes = VoteFilter { post_id: Some(post.id), user_id: None };
    for vote in store.votes().list(&votes).await? {
        store.votes().delete(vote.id).await?;
        bump_stats(store, vote.user_id, |stats| step(&mut stats.votes, false)).await?;
    }
    store.posts().delete(post.id).await?;
    bump_stats(store, user.id, |stats| step(&mut stats.posts, false)).await?;

    changes.notify(post.id);
    info!("{} deleted post {}", user.id, post.id);
    Ok(())
}

/// Posts shown under `tab` to `viewer`.
pub async fn list_feed(store: &Store, viewer: &Profile, tab: Tab, order: PostOrder) -> AppResult<Vec<Post>> {
    let filter = match tab {
        Tab::Global => PostFilter { kind: Some(PostKind::Global), ..Default::default() },
        Tab::Branch => PostFilter {
            kind: Some(PostKind::Branch),
            branch: Some(viewer.branch.clone()),
            ..Default::default()
        },
        Tab::Doubts => PostFilter { kind: Some(PostKind::Doubt), ..Default::default() },
    };

    store.posts().list(&PostFilter { order, limit: Some(FEED_LIMIT), ..filter }).await
}

pub(crate) async fn user_vote(store: &Store, user_id: Uuid, post_id: Uuid) -> AppResult<Option<VoteKind>> {
    Ok(store
        .votes()
        .list(&VoteFilter { post_id: Some(post_id), user_id: Some(user_id) })
        .await?
        .pop()
        .map(|vote| vote.kind))
}

/// A post card as `viewer` sees it. Votes cast from it come back to `return_url`.
pub(crate) async fn post_item(
    store: &Store,
    post: &Post,
    viewer: &Profile,
    return_url: &str,
    now: OffsetDateTime,
) -> AppResult<String> {
    let author = store.profiles().get(post.author_id).await?;
    let tally = post.tally(user_vote(store, viewer.id, post.id).await?);

    let (avatar, author_name, role, affiliation) = match &author {
        Some(author) => (
            profiles::avatar(author),
            escape(&author.full_name),
            author.role.label(),
            escape(&author.affiliation()),
        ),
        None => ("?".to_owned(), "Former member".to_owned(), "", String::new()),
    };

    let actions = if post.author_id == viewer.id {
        format!(
            "<a href=\"/posts/{0}/edit\">Edit</a>\
             <form method=\"post\" action=\"/posts/{0}/delete\"><button class=\"danger\">Delete</button></form>",
            post.id
        )
    } else {
        format!("<a href=\"/p/{}\">View profile</a>", post.author_id)
    };

    let voted = |kind| if tally.user_vote == Some(kind) { "voted" } else { "" };

    Ok(include_res!(str, "/pages/post_item.html")
        .replace("{id}", &post.id.to_string())
        .replace("{author_id}", &post.author_id.to_string())
        .replace("{avatar}", &avatar)
        .replace("{author_name}", &author_name)
        .replace("{role}", role)
        .replace("{affiliation}", &affiliation)
        .replace("{time_ago}", &crate::display::time_ago(post.created_at, now))
        .replace("{kind}", post.kind.as_str())
        .replace("{title}", &post.title.as_deref().map(|t| format!("<h3>{}</h3>", escape(t))).unwrap_or_default())
        .replace("{image}", &post.image.as_deref().map(|i| format!("<img src=\"{}\" alt=\"Post content\">", escape(i))).unwrap_or_default())
        .replace("{up_class}", voted(VoteKind::Up))
        .replace("{down_class}", voted(VoteKind::Down))
        .replace("{net}", &tally.net().to_string())
        .replace("{comment_count}", &post.comment_count.to_string())
        .replace("{actions}", &actions)
        .replace("{return_url}", &escape(return_url))
        // last, so text inside the body is never taken for a placeholder
        .replace("{body}", &markdown(&post.body)))
}

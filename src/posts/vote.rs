use std::sync::Arc;

use axum::{debug_handler, extract::{Path, State}, response::Redirect, Form};
use serde::Deserialize;
use tokio::sync::{Mutex, MutexGuard};
use tower_sessions::Session;
use tracing::debug;
use uuid::Uuid;

use crate::{model::{Profile, Vote}, profiles::{bump_stats, step}, session::{flash, local_path, CurrentUser, Notice}, store::{Store, VoteFilter}, votes::{VoteKind, VoteTally}, AppError, AppResult, AppState};

use super::user_vote;

/// Held while a post's counters are read, changed and written back.
#[derive(Clone, Default)]
pub struct CounterLock(Arc<Mutex<()>>);

impl CounterLock {
    pub async fn hold(&self) -> MutexGuard<'_, ()> {
        self.0.lock().await
    }
}

/// Applies `kind` from `user` to the post and returns the tally they now see.
pub async fn cast_vote(
    store: &Store,
    lock: &CounterLock,
    user: &Profile,
    post_id: Uuid,
    kind: VoteKind,
) -> AppResult<VoteTally> {
    let _guard = lock.hold().await;

    let Some(mut post) = store.posts().get(post_id).await? else {
        return Err(AppError::not_found("post"));
    };
    let existing = store
        .votes()
        .list(&VoteFilter { post_id: Some(post_id), user_id: Some(user.id) })
        .await?
        .pop();

    let before = post.tally(existing.as_ref().map(|vote| vote.kind));
    let after = before.apply_vote(kind);

    match (existing, after.user_vote) {
        (Some(vote), None) => {
            store.votes().delete(vote.id).await?;
            bump_stats(store, user.id, |stats| step(&mut stats.votes, false)).await?;
        }
        (Some(mut vote), Some(kind)) => {
            vote.kind = kind;
            store.votes().put(&vote).await?;
        }
        (None, Some(kind)) => {
            let vote = Vote { id: Uuid::now_v7(), post_id, user_id: user.id, kind };
            store.votes().put(&vote).await?;
            bump_stats(store, user.id, |stats| step(&mut stats.votes, true)).await?;
        }
        (None, None) => {}
    }

    post.upvotes = after.upvotes;
    post.downvotes = after.downvotes;
    store.posts().put(&post).await?;

    debug!("{} voted {} on {post_id}, net {:+}", user.id, kind.as_str(), before.net_change(&after));
    Ok(after)
}

#[derive(Deserialize)]
pub(crate) struct VoteForm {
    kind: String,
    #[serde(default)]
    return_url: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn vote(
    Path(post_id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
    State(store): State<Store>,
    State(lock): State<CounterLock>,
    session: Session,
    Form(VoteForm { kind, return_url }): Form<VoteForm>,
) -> AppResult<Redirect> {
    let back = return_url.filter(|url| local_path(url)).unwrap_or("/".to_owned());

    let result = match VoteKind::parse(&kind) {
        Some(kind) => cast_vote(&store, &lock, &user, post_id, kind).await,
        None => Err(AppError::invalid("Votes are up or down.")),
    };
    if let Err(err) = result {
        flash(&session, Notice::from(&err)).await?;
    }

    Ok(Redirect::to(&format!("{back}#post-{post_id}")))
}

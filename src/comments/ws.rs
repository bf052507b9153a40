use axum::{debug_handler, extract::{ws::Message, Path, State, WebSocketUpgrade}, response::IntoResponse};
use futures_util::{SinkExt, StreamExt};
use tracing::debug;
use uuid::Uuid;

use crate::{changes::ChangeFeed, session::CurrentUser, store::Store, AppError, AppResult};

/// Sends `changed` whenever the post's comments change; the page then refetches them.
#[debug_handler(state = crate::AppState)]
pub async fn comments_ws(
    Path(post_id): Path<Uuid>,
    CurrentUser(_): CurrentUser,
    State(store): State<Store>,
    State(changes): State<ChangeFeed>,

    ws: WebSocketUpgrade,
) -> AppResult<impl IntoResponse> {
    if store.posts().get(post_id).await?.is_none() {
        return Err(AppError::not_found("post"));
    }

    Ok(ws.on_upgrade(async move |stream| {
        let mut subscription = changes.subscribe(post_id);
        let (mut sender, mut receiver) = stream.split();

        let mut notify_task = tokio::spawn(async move {
            while subscription.changed().await {
                if sender.send(Message::text("changed")).await.is_err() {
                    break;
                }
            }
        });

        // nothing is read from clients; this only notices them leaving
        let mut listen_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = receiver.next().await {
                if let Message::Close(_) = msg {
                    break;
                }
            }
        });

        tokio::select! {
            _ = &mut notify_task => listen_task.abort(),
            _ = &mut listen_task => notify_task.abort(),
        };
        debug!("comment listener for {post_id} left");
    }))
}

use axum::{debug_handler, extract::{Path, State}, response::Redirect, routing::post, Router};
use time::OffsetDateTime;
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

use crate::{include_res, model::{Connection, ConnectionStatus, Profile}, profiles, res::escape, session::{conclude, CurrentUser, Notice}, store::{ConnectionFilter, Store}, AppError, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/connections/{id}", post(request))
        .route("/connections/{id}/accept", post(accept))
        .route("/connections/{id}/decline", post(decline))
}

/// The record for this pair, whichever of them asked.
pub async fn between(store: &Store, a: Uuid, b: Uuid) -> AppResult<Option<Connection>> {
    Ok(store
        .connections()
        .list(&ConnectionFilter { between: Some((a, b)), ..Default::default() })
        .await?
        .pop())
}

pub async fn send_request(
    store: &Store,
    requester: &Profile,
    recipient_id: Uuid,
    now: OffsetDateTime,
) -> AppResult<Connection> {
    if requester.id == recipient_id {
        return Err(AppError::invalid("You can't connect with yourself."));
    }
    if store.profiles().get(recipient_id).await?.is_none() {
        return Err(AppError::not_found("member"));
    }
    if between(store, requester.id, recipient_id).await?.is_some() {
        return Err(AppError::invalid("A connection between you two already exists."));
    }

    let connection = Connection::request(requester.id, recipient_id, now);
    store.connections().put(&connection).await?;

    info!("{} asked to connect with {recipient_id}", requester.id);
    Ok(connection)
}

/// Only the recipient answers, and only once.
pub async fn respond(store: &Store, user: &Profile, connection_id: Uuid, accept: bool) -> AppResult<Connection> {
    let Some(mut connection) = store.connections().get(connection_id).await? else {
        return Err(AppError::not_found("request"));
    };
    if connection.recipient_id != user.id {
        return Err(AppError::Forbidden("Only the person you asked can answer this request.".to_owned()));
    }

    connection.respond(accept)?;
    store.connections().put(&connection).await?;

    info!("{} {} connection {connection_id}", user.id, connection.status.as_str());
    Ok(connection)
}

/// Requests waiting on `user_id`, with who sent them.
pub async fn pending_for(store: &Store, user_id: Uuid) -> AppResult<Vec<(Connection, Profile)>> {
    let requests = store
        .connections()
        .list(&ConnectionFilter {
            recipient_id: Some(user_id),
            status: Some(ConnectionStatus::Pending),
            ..Default::default()
        })
        .await?;

    let mut pending = Vec::with_capacity(requests.len());
    for request in requests {
        if let Some(requester) = store.profiles().get(request.requester_id).await? {
            pending.push((request, requester));
        }
    }
    Ok(pending)
}

pub async fn count_accepted(store: &Store, user_id: Uuid) -> AppResult<usize> {
    Ok(store
        .connections()
        .list(&ConnectionFilter {
            member: Some(user_id),
            status: Some(ConnectionStatus::Accepted),
            ..Default::default()
        })
        .await?
        .len())
}

/// Connect button as seen by `viewer_id` on `target_id`'s profile. Empty on your own.
pub(crate) fn button(viewer_id: Uuid, target_id: Uuid, connection: Option<&Connection>) -> String {
    if viewer_id == target_id {
        return String::new();
    }

    match connection.map(|c| c.status) {
        None => format!(
            "<form method=\"post\" action=\"/connections/{target_id}\"><button>Connect</button></form>"
        ),
        Some(ConnectionStatus::Pending) => "<button disabled>Pending</button>".to_owned(),
        Some(ConnectionStatus::Accepted) => "<button disabled>Connected</button>".to_owned(),
        Some(ConnectionStatus::Declined) => "<button disabled>Declined</button>".to_owned(),
    }
}

pub(crate) fn request_item(connection: &Connection, requester: &Profile, now: OffsetDateTime) -> String {
    include_res!(str, "/pages/request_item.html")
        .replace("{id}", &connection.id.to_string())
        .replace("{requester_id}", &requester.id.to_string())
        .replace("{avatar}", &profiles::avatar(requester))
        .replace("{full_name}", &escape(&requester.full_name))
        .replace("{affiliation}", &escape(&requester.affiliation()))
        .replace("{time_ago}", &crate::display::time_ago(connection.created_at, now))
}

#[debug_handler(state = AppState)]
async fn request(
    Path(user_id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
    State(store): State<Store>,
    session: Session,
) -> AppResult<Redirect> {
    let back = format!("/p/{user_id}");
    let result = async {
        send_request(&store, &user, user_id, OffsetDateTime::now_utc()).await?;
        Ok::<_, AppError>((
            Notice::success("Connection request sent", "Your request has been sent successfully."),
            back.clone(),
        ))
    }.await;

    conclude(&session, &back, result).await
}

async fn answer(store: &Store, session: &Session, user: &Profile, id: Uuid, accept: bool) -> AppResult<Redirect> {
    let result = async {
        let connection = respond(store, user, id, accept).await?;
        let (title, verb) = match connection.status {
            ConnectionStatus::Accepted => ("Request accepted", "accepted"),
            _ => ("Request declined", "declined"),
        };
        Ok::<_, AppError>((
            Notice::success(title, &format!("You have {verb} the connection request.")),
            "/".to_owned(),
        ))
    }.await;

    conclude(session, "/", result).await
}

#[debug_handler(state = AppState)]
async fn accept(
    Path(id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
    State(store): State<Store>,
    session: Session,
) -> AppResult<Redirect> {
    answer(&store, &session, &user, id, true).await
}

#[debug_handler(state = AppState)]
async fn decline(
    Path(id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
    State(store): State<Store>,
    session: Session,
) -> AppResult<Redirect> {
    answer(&store, &session, &user, id, false).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_follows_connection_state() {
        let (me, them) = (Uuid::now_v7(), Uuid::now_v7());
        assert_eq!(button(me, me, None), "");
        assert!(button(me, them, None).contains("Connect"));

        let mut connection = Connection::request(me, them, OffsetDateTime::now_utc());
        assert!(button(me, them, Some(&connection)).contains("Pending"));
        connection.respond(true).unwrap();
        assert!(button(them, me, Some(&connection)).contains("Connected"));
    }
}

use axum::{debug_handler, extract::Query, response::Redirect};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{session::{flash, local_path, sign_out, Notice}, AppResult};

#[derive(Deserialize)]
pub(crate) struct LogoutQuery {
    pub(crate) return_url: Option<String>,
}

#[debug_handler]
pub(crate) async fn logout(
    Query(LogoutQuery { return_url }): Query<LogoutQuery>,
    session: Session
) -> AppResult<Redirect> {
    sign_out(&session).await;
    flash(&session, Notice::success("Logged out successfully", "You have been logged out of your account.")).await?;
    let back = return_url.filter(|url| local_path(url)).unwrap_or("/".to_owned());
    Ok(Redirect::to(&back))
}

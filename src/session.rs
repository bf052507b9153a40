use axum::{extract::{FromRef, FromRequestParts}, http::request::Parts, response::Redirect};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::warn;
use uuid::Uuid;

use crate::{include_res, model::Profile, res::escape, store::Store, AppError, AppResult};

pub const USER_ID: &str = "user_id";
pub const CSRF_STATE: &str = "csrf_state";
pub const PKCE_VERIFIER: &str = "pkce_verifier";
pub const RETURN_URL: &str = "return_url";
pub const NOTICE: &str = "notice";

/// A one-shot message shown on the next page the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub error: bool,
}

impl Notice {
    pub fn success(title: &str, description: &str) -> Notice {
        Notice {
            title: title.to_owned(),
            description: description.to_owned(),
            error: false,
        }
    }
}

impl From<&AppError> for Notice {
    fn from(err: &AppError) -> Notice {
        Notice {
            title: err.title().to_owned(),
            description: err.to_string(),
            error: true,
        }
    }
}

pub async fn flash(session: &Session, notice: Notice) -> AppResult<()> {
    session.insert(NOTICE, notice).await?;
    Ok(())
}

/// Pending notice as HTML, empty when there is none.
pub async fn take_notice(session: &Session) -> AppResult<String> {
    let Some(notice) = session.remove::<Notice>(NOTICE).await? else {
        return Ok(String::new());
    };

    Ok(include_res!(str, "/pages/notice.html")
        .replace("{kind}", if notice.error { "error" } else { "success" })
        .replace("{title}", &escape(&notice.title))
        .replace("{description}", &escape(&notice.description)))
}

/// Turns the result of a form submission into a redirect plus a notice.
///
/// Failures go back to `back` with the error as the notice; being signed out still sends the
/// user to the login page.
pub async fn conclude(
    session: &Session,
    back: &str,
    result: AppResult<(Notice, String)>,
) -> AppResult<Redirect> {
    match result {
        Ok((notice, to)) => {
            flash(session, notice).await?;
            Ok(Redirect::to(&to))
        }
        Err(AppError::Unauthenticated) => Err(AppError::Unauthenticated),
        Err(err) => {
            if let AppError::Transient(cause) = &err {
                warn!("form submission failed: {cause:#}");
            }
            flash(session, Notice::from(&err)).await?;
            Ok(Redirect::to(back))
        }
    }
}

/// Whether `url` is a path on this site. Browsers take `//host` and `/\host` to another host.
pub fn local_path(url: &str) -> bool {
    let mut chars = url.chars();
    chars.next() == Some('/')
        && !matches!(chars.next(), Some('/' | '\\'))
        && !url.chars().any(|c| c.is_ascii_control())
}

pub async fn sign_in(session: &Session, user_id: Uuid) -> AppResult<()> {
    session.cycle_id().await?;
    session.insert(USER_ID, user_id).await?;
    Ok(())
}

pub async fn sign_out(session: &Session) {
    session.clear().await;
}

/// The signed-in user, if any.
pub struct MaybeUser(pub Option<Profile>);

/// The signed-in user; anyone else is sent to the login page.
pub struct CurrentUser(pub Profile);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    Store: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::from(msg))?;

        let Some(user_id) = session.get::<Uuid>(USER_ID).await? else {
            return Ok(MaybeUser(None));
        };

        let profile = Store::from_ref(state).profiles().get(user_id).await?;
        if profile.is_none() {
            warn!("session for missing profile {user_id}");
            session.remove::<Uuid>(USER_ID).await?;
        }

        Ok(MaybeUser(profile))
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Store: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        MaybeUser::from_request_parts(parts, state)
            .await?
            .0
            .map(CurrentUser)
            .ok_or(AppError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_paths_on_this_site_are_local() {
        for url in ["/", "/posts/1#post-1", "/?tab=branch", "/p/me"] {
            assert!(local_path(url), "{url}");
        }
        for url in ["", "posts", "//evil.example/phish", "/\\evil.example", "https://evil.example", "/\t/evil.example"] {
            assert!(!local_path(url), "{url}");
        }
    }
}

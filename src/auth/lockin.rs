use axum::{debug_handler, extract::{Path, Query, State}, response::Redirect};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::info;

use crate::{session::{conclude, local_path, sign_in, Notice, CSRF_STATE, PKCE_VERIFIER, RETURN_URL}, store::{ProfileFilter, Store}, AppError, AppResult, AppState};

use super::{clients::ClientProvider, normalize_email, Clients};

#[derive(Deserialize)]
pub struct LockinQuery {
    pub state: Option<String>,
    pub code: Option<String>,
}

/// Provider callback. Only signs in accounts that already exist with the provider's email.
#[debug_handler(state = AppState)]
pub(crate) async fn lockin(
    Path(provider): Path<ClientProvider>,
    Query(LockinQuery { state, code }): Query<LockinQuery>,
    State(store): State<Store>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<Redirect> {
    let result = async {
        let state = CsrfToken::new(state.ok_or("OAuth: without state")?);
        let code = AuthorizationCode::new(code.ok_or("OAuth: without code")?);

        let Some(stored_state) = session.remove::<String>(CSRF_STATE).await? else {
            return Err("no csrf_state")?;
        };

        if state.secret().as_str() != stored_state.as_str() {
            return Err("csrf tokens don't match")?;
        }

        let Some(pkce_verifier) = session.remove::<String>(PKCE_VERIFIER).await? else {
            return Err("no pkce_verifier")?;
        };

        let client = clients.get_client(provider)?;
        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        let token_result = client
            .exchange_code(code)
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
            .request_async(&http_client)
            .await?;

        let access_token = token_result.access_token().secret();
        let email = normalize_email(&provider.fetch_email(&http_client, access_token).await?);

        let Some(profile) = store.profiles().list(&ProfileFilter::by_email(&email)).await?.pop() else {
            return Err(AppError::NotFound(format!(
                "No account uses {email} yet. Sign up first, then continue with {provider}."
            )));
        };

        sign_in(&session, profile.id).await?;
        info!("welcome back {} via {provider}", profile.id);

        let return_url = session.remove::<String>(RETURN_URL).await?;
        Ok::<_, AppError>((
            Notice::success("Welcome back!", "You have successfully logged in."),
            return_url.filter(|url| local_path(url)).unwrap_or("/".to_owned()),
        ))
    }.await;

    let back = match &result {
        Err(AppError::NotFound(_)) => "/signup",
        _ => "/login",
    };
    conclude(&session, back, result).await
}

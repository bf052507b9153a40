use axum::{debug_handler, extract::{Path, Query, State}, response::{Html, IntoResponse, Redirect, Response}, Form};
use oauth2::{CsrfToken, PkceCodeChallenge};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{debug, info};

use crate::{include_res, model::Profile, session::{conclude, local_path, sign_in, take_notice, MaybeUser, Notice, CSRF_STATE, PKCE_VERIFIER, RETURN_URL}, store::{ProfileFilter, Store}, AppError, AppResult, AppState};

use super::{clients::ClientProvider, normalize_email, verify_password, Clients};

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    pub(crate) return_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LoginForm {
    pub(crate) email: String,
    pub(crate) password: String,
}

/// Unknown emails are `NotFound`; a wrong password, or an account without one, is `Forbidden`.
pub async fn sign_in_with_password(store: &Store, email: &str, password: &str) -> AppResult<Profile> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::invalid("Please fill in all fields."));
    }

    let email = normalize_email(email);
    let Some(profile) = store.profiles().list(&ProfileFilter::by_email(&email)).await?.pop() else {
        return Err(AppError::NotFound("No account found with this email address.".to_owned()));
    };

    let Some(hash) = &profile.password_hash else {
        return Err(AppError::Forbidden("This account signs in with Google or GitHub.".to_owned()));
    };
    if !verify_password(password, hash)? {
        return Err(AppError::Forbidden("Incorrect email or password.".to_owned()));
    }

    Ok(profile)
}

fn provider_button(clients: &Clients, provider: ClientProvider, label: &str) -> String {
    if !clients.enabled(provider) {
        return String::new();
    }
    format!("<a class=\"button outline\" href=\"/login/{}\">Continue with {label}</a>", provider.key())
}

#[debug_handler(state = AppState)]
pub(crate) async fn login_page(
    MaybeUser(user): MaybeUser,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let providers = provider_button(&clients, ClientProvider::Google, "Google")
        + &provider_button(&clients, ClientProvider::Github, "GitHub");

    Ok(Html(
        include_res!(str, "/pages/login.html")
        .replace("{notice}", &take_notice(&session).await?)
        .replace("{providers}", &providers)
    ).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn password_login(
    State(store): State<Store>,
    session: Session,
    Form(LoginForm { email, password }): Form<LoginForm>,
) -> AppResult<Redirect> {
    let result = async {
        let profile = sign_in_with_password(&store, &email, &password).await?;
        sign_in(&session, profile.id).await?;
        info!("welcome back {}", profile.id);

        let return_url = session.remove::<String>(RETURN_URL).await?;
        Ok::<_, AppError>((
            Notice::success("Welcome back!", "You have successfully logged in."),
            return_url.filter(|url| local_path(url)).unwrap_or("/".to_owned()),
        ))
    }.await;

    conclude(&session, "/login", result).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    Path(provider): Path<ClientProvider>,
    Query(LoginQuery { return_url }): Query<LoginQuery>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<Response> {
    let client = clients.get_client(provider)?;

    let (pkce_code_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (authorize_url, csrf_state) = client.authorize_url(CsrfToken::new_random)
        .add_scopes(provider.scopes())
        .set_pkce_challenge(pkce_code_challenge)
        .url();

    session.insert(CSRF_STATE, csrf_state.secret()).await?;
    session.insert(PKCE_VERIFIER, pkce_verifier.secret()).await?;
    if let Some(return_url) = return_url.filter(|url| local_path(url)) {
        session.insert(RETURN_URL, return_url).await?;
    }

    debug!("sending sign-in to {provider}");
    Ok(Redirect::to(authorize_url.as_str()).into_response())
}

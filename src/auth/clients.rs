use std::{fmt, path::Path};

use oauth2::{basic::BasicClient, AuthUrl, Client, ClientId, ClientSecret, RedirectUrl, Scope, TokenUrl};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::{AppError, AppResult, GetField};

type HappyClient = Client<oauth2::StandardErrorResponse<oauth2::basic::BasicErrorResponseType>, oauth2::StandardTokenResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardTokenIntrospectionResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardRevocableToken, oauth2::StandardErrorResponse<oauth2::RevocationErrorResponseType>, oauth2::EndpointSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointSet>;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClientProvider {
    Google,
    Github,
}

impl ClientProvider {
    pub fn key(&self) -> &str {
        use ClientProvider::*;
        match self {
            Google => "google",
            Github => "github",
        }
    }

    fn endpoints(&self) -> (&'static str, &'static str) {
        use ClientProvider::*;
        match self {
            Google => (
                "https://accounts.google.com/o/oauth2/auth",
                "https://oauth2.googleapis.com/token",
            ),
            Github => (
                "https://github.com/login/oauth/authorize",
                "https://github.com/login/oauth/access_token",
            ),
        }
    }

    pub fn scopes(&self) -> Vec<Scope> {
        use ClientProvider::*;
        let scopes: &[&str] = match self {
            Google => &["openid", "email", "profile"],
            Github => &["read:user", "user:email"],
        };
        scopes.iter().map(|s| Scope::new(s.to_string())).collect()
    }

    /// The verified address the provider knows this user by.
    pub async fn fetch_email(&self, http_client: &reqwest::Client, access_token: &str) -> AppResult<String> {
        use ClientProvider::*;
        match self {
            Google => {
                let body: Value = http_client
                    .get("https://openidconnect.googleapis.com/v1/userinfo")
                    .bearer_auth(access_token)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                body.get_str_field("email")
            }
            Github => {
                #[derive(Deserialize)]
                struct GithubEmail {
                    email: String,
                    primary: bool,
                    verified: bool,
                }

                let emails: Vec<GithubEmail> = http_client
                    .get("https://api.github.com/user/emails")
                    .bearer_auth(access_token)
                    .header(reqwest::header::USER_AGENT, "alumnet")
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                emails
                    .into_iter()
                    .find(|e| e.primary && e.verified)
                    .map(|e| e.email)
                    .ok_or(AppError::invalid("Your GitHub account has no verified primary email."))
            }
        }
    }
}

impl fmt::Display for ClientProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone, Default)]
pub struct Clients {
    google_client: Option<HappyClient>,
    github_client: Option<HappyClient>,
}

impl Clients {
    /// Providers with keys in `path`; a missing file leaves OAuth sign-in off.
    pub fn load(path: &Path, public_url: &str) -> AppResult<Clients> {
        if !path.exists() {
            info!("{} not found, OAuth sign-in disabled", path.display());
            return Ok(Clients::default());
        }

        let json: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        Clients::from_json(json, public_url)
    }

    pub fn from_json(json: Value, public_url: &str) -> AppResult<Clients> {
        let client = |provider: ClientProvider| -> AppResult<Option<HappyClient>> {
            let Some(json) = json.get(provider.key()) else {
                return Ok(None);
            };
            let client_id = ClientId::new(json.get_str_field("client_id")?);
            let client_secret = ClientSecret::new(json.get_str_field("client_secret")?);

            let (auth_url, token_url) = provider.endpoints();
            let auth_url = AuthUrl::new(auth_url.to_string())?;
            let token_url = TokenUrl::new(token_url.to_string())?;
            let redirect_url = RedirectUrl::new(format!("{public_url}/lockin/{}", provider.key()))?;

            info!("OAuth sign-in enabled for {provider}");
            Ok(Some(
                BasicClient::new(client_id)
                .set_client_secret(client_secret)
                .set_auth_uri(auth_url)
                .set_token_uri(token_url)
                .set_redirect_uri(redirect_url)
            ))
        };

        Ok(
            Clients {
                google_client: client(ClientProvider::Google)?,
                github_client: client(ClientProvider::Github)?,
            }
        )
    }

    pub fn enabled(&self, provider: ClientProvider) -> bool {
        self.get_client(provider).is_ok()
    }

    pub fn get_client(&self, provider: ClientProvider) -> AppResult<HappyClient> {
        use ClientProvider::*;
        match provider {
            Google => self.google_client.clone(),
            Github => self.github_client.clone(),
        }.ok_or(AppError::NotFound(format!("Sign-in with {provider} isn't set up.")))
    }
}

use axum::{debug_handler, extract::State, response::{Html, IntoResponse, Redirect, Response}, Form};
use rand::seq::IndexedRandom;
use serde::Deserialize;
use time::OffsetDateTime;
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

use crate::{aura::ActivityStats, include_res, model::{AlumniDetails, Placement, Profile, Role, RoleKind, AVATARS, BRANCHES}, res::escape, session::{conclude, sign_in, take_notice, MaybeUser, Notice}, store::{ProfileFilter, Store}, AppError, AppResult, AppState};

use super::{hash_password, normalize_email, MIN_PASSWORD_LEN};

/// Signup form as posted. Fields the chosen role doesn't use are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub role: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub college: String,
    pub branch: String,
    pub year_of_passing: String,
    /// "yes" when the alumni has been placed.
    pub placement_done: String,
    pub company_name: String,
    pub role_description: String,
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_owned())
}

impl SignupForm {
    fn role(&self, now: OffsetDateTime) -> AppResult<Role> {
        match RoleKind::parse(self.role.trim()) {
            Some(RoleKind::Student) => Ok(Role::Student),
            Some(RoleKind::Alumni) => {
                let year = self.year_of_passing.trim();
                if year.is_empty() {
                    return Err(AppError::invalid("Year of passing is required for alumni."));
                }
                let latest = now.year();
                let year_of_passing = year
                    .parse::<u16>()
                    .ok()
                    .filter(|year| (1990..=latest).contains(&i32::from(*year)))
                    .ok_or_else(|| {
                        AppError::invalid(format!("Year of passing must be between 1990 and {latest}."))
                    })?;

                let placement = match self.placement_done.as_str() {
                    "yes" => Some(Placement {
                        company: non_empty(&self.company_name).ok_or_else(|| {
                            AppError::invalid("Add the company you were placed at.")
                        })?,
                        role_description: non_empty(&self.role_description),
                    }),
                    _ => None,
                };

                Ok(Role::Alumni(AlumniDetails { year_of_passing, placement }))
            }
            None => Err(AppError::invalid("Choose whether you are a student or an alumni.")),
        }
    }
}

/// Validates the form and stores a new account. Nothing is stored when validation fails.
pub async fn sign_up(store: &Store, form: SignupForm, now: OffsetDateTime) -> AppResult<Profile> {
    let required = [&form.role, &form.full_name, &form.email, &form.password, &form.college, &form.branch];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(AppError::invalid("Please fill in all required fields."));
    }

    let role = form.role(now)?;

    let email = normalize_email(&form.email);
    if !email.contains('@') {
        return Err(AppError::invalid("That doesn't look like an email address."));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::invalid(format!(
            "Passwords need at least {MIN_PASSWORD_LEN} characters."
        )));
    }
    let branch = form.branch.trim();
    if !BRANCHES.contains(&branch) {
        return Err(AppError::invalid("Pick your branch from the list."));
    }

    if !store.profiles().list(&ProfileFilter::by_email(&email)).await?.is_empty() {
        return Err(AppError::DuplicateAccount);
    }

    let profile = Profile {
        id: Uuid::now_v7(),
        full_name: form.full_name.trim().to_owned(),
        email,
        password_hash: Some(hash_password(&form.password)?),
        role,
        college: form.college.trim().to_owned(),
        branch: branch.to_owned(),
        avatar: AVATARS.choose(&mut rand::rng()).map(|avatar| avatar.to_string()),
        stats: ActivityStats::default(),
        created_at: now,
    };
    store.profiles().put(&profile).await?;

    info!("new {} account {} ({})", profile.role.kind().as_str(), profile.id, profile.full_name);
    Ok(profile)
}

pub(crate) fn branch_options(selected: Option<&str>) -> String {
    BRANCHES
        .iter()
        .map(|branch| {
            let selected = if Some(*branch) == selected { " selected" } else { "" };
            format!("<option value=\"{0}\"{selected}>{0}</option>", escape(branch))
        })
        .collect()
}

#[debug_handler(state = AppState)]
pub(crate) async fn signup_page(
    MaybeUser(user): MaybeUser,
    session: Session,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    Ok(Html(
        include_res!(str, "/pages/signup.html")
        .replace("{notice}", &take_notice(&session).await?)
        .replace("{branch_options}", &branch_options(None))
    ).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn signup(
    State(store): State<Store>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> AppResult<Redirect> {
    let result = async {
        let profile = sign_up(&store, form, OffsetDateTime::now_utc()).await?;
        sign_in(&session, profile.id).await?;
        Ok::<_, AppError>((
            Notice::success("Account Created!", "Welcome to Alumni Connect."),
            "/".to_owned(),
        ))
    }.await;

    conclude(&session, "/signup", result).await
}

use axum::{http::StatusCode, response::{IntoResponse, Redirect, Response}};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Rejected before anything reached the store.
    #[error("{0}")]
    Validation(String),

    #[error("This email is already registered. Please sign in instead.")]
    DuplicateAccount,

    #[error("{0}")]
    NotFound(String),

    #[error("You need to be signed in to do that.")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    /// Anything else the backing services failed at. Resubmitting may succeed.
    #[error("Something went wrong. Please try again.")]
    Transient(anyhow::Error),
}

impl AppError {
    pub fn invalid(msg: impl Into<String>) -> AppError {
        AppError::Validation(msg.into())
    }

    pub fn not_found(what: &str) -> AppError {
        AppError::NotFound(format!("That {what} doesn't exist anymore."))
    }

    /// Notice headline shown to the user.
    pub fn title(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "Missing Information",
            AppError::DuplicateAccount => "Account Exists",
            AppError::NotFound(_) => "Not Found",
            AppError::Unauthenticated => "Please Sign In",
            AppError::Forbidden(_) => "Not Allowed",
            AppError::Transient(_) => "Error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateAccount => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Transient(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Unauthenticated => return Redirect::to("/login").into_response(),
            AppError::Transient(err) => tracing::error!("{err:#}"),
            _ => {}
        }

        (self.status(), self.to_string()).into_response()
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        Self::Transient(anyhow::Error::msg(err))
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self::Transient(anyhow::Error::msg(err.to_owned()))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Transient(err)
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self::Transient(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(serde_json::Error);
apperr_impl!(tower_sessions::session::Error);
apperr_impl!(axum::Error);
apperr_impl!(reqwest::Error);
apperr_impl!(uuid::Error);
apperr_impl!(oauth2::url::ParseError);
apperr_impl!(sqlx::migrate::MigrateError);
apperr_impl!(std::num::TryFromIntError);
apperr_impl!(time::error::ComponentRange);
apperr_impl!(time::error::Format);
apperr_impl!(std::io::Error);

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db) if db.is_unique_violation() && db.message().contains("email") => {
                AppError::DuplicateAccount
            }
            _ => Self::Transient(anyhow::Error::from(err)),
        }
    }
}

impl<E: core::error::Error + Send + Sync + 'static, R: oauth2::ErrorResponse + Send + Sync + 'static> From<oauth2::RequestTokenError<E, R>> for AppError {
    fn from(err: oauth2::RequestTokenError<E, R>) -> Self {
        Self::Transient(anyhow::Error::from(err))
    }
}

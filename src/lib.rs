pub mod aura;
pub mod auth;
pub mod changes;
pub mod comments;
pub mod config;
pub mod connections;
pub mod display;
pub mod error;
pub mod model;
pub mod posts;
pub mod profiles;
pub mod res;
pub mod search;
pub mod seed;
pub mod session;
pub mod store;
pub mod threads;
pub mod votes;

use axum::{extract::FromRef, Router};
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

pub use error::{AppError, AppResult};

use crate::{changes::ChangeFeed, config::Config, posts::CounterLock, store::Store};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: Store,
    pub clients: auth::Clients,
    pub changes: ChangeFeed,
    pub counters: CounterLock,
}

impl AppState {
    pub fn new(store: Store, clients: auth::Clients) -> AppState {
        AppState {
            store,
            clients,
            changes: ChangeFeed::default(),
            counters: CounterLock::default(),
        }
    }
}

/// Every route, with sessions and request tracing.
pub fn app(state: AppState, config: &Config) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(config.session_idle_minutes)));

    Router::new()
        .merge(auth::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(connections::router())
        .merge(search::router())
        .nest("/p", profiles::router())
        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}

pub trait GetField {
    fn get_str_field(&self, field: &str) -> AppResult<String>;
}

impl GetField for Value {
    fn get_str_field(&self, field: &str) -> AppResult<String> {
        Ok(
            self.get(field)
            .ok_or(format!("expected {field} in {self}"))?
            .as_str()
            .ok_or(format!("expected {field} in {self} to be string"))?
            .to_owned()
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn string_fields_are_required() {
        let value: Value = json!({ "client_id": "abc", "port": 8080 });
        assert_eq!(value.get_str_field("client_id").unwrap(), "abc");
        assert!(value.get_str_field("port").is_err());
        assert!(value.get_str_field("missing").is_err());
    }
}

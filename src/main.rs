use alumnet::{app, auth, config::Config, seed, store::{SqliteStore, Store}, AppState};
use time::OffsetDateTime;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;

    let store = Store::new(SqliteStore::connect(&config.database_url).await?);
    if config.seed_sample_data && seed::seed_if_empty(&store, OffsetDateTime::now_utc()).await? {
        info!("sample data added to {}", config.database_url);
    }

    let clients = auth::Clients::load(&config.client_secret_path, &config.public_url)?;
    let app = app(AppState::new(store, clients), &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

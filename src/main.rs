//! Campus Market - storefront API server

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use campus_market::{
    config::Config,
    http::{router, AppState},
    publisher::EventPublisher,
    services::accounts,
    store::{MarketStore, MemoryStore, PgStore},
    uploads::ImageStore,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn MarketStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(config.database_max_connections).connect(url).await
                .context("connecting to Postgres")?;
            sqlx::migrate!("./migrations").run(&pool).await.context("running migrations")?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, data lives in memory and is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let publisher = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => EventPublisher::new(client),
            Err(e) => {
                warn!(error = %e, "NATS unavailable, events will not be published");
                EventPublisher::disabled()
            }
        },
        None => EventPublisher::disabled(),
    };

    if let Some((student_number, password)) = config.admin_credentials() {
        accounts::ensure_admin(store.as_ref(), student_number, password).await?;
    }

    let images = ImageStore::open(&config.upload_dir, &config.public_base_url).await?;
    let state = AppState { store, images: Arc::new(images), publisher };

    let cors = match &config.cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>().context("invalid CORS_ORIGIN")?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    };
    let app = router(state).layer(TraceLayer::new_for_http()).layer(cors);

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Campus Market listening on {addr}");
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}

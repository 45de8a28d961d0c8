//! GearUp storefront server.

use anyhow::Result;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gearup::config::Config;
use gearup::services::events::EventPublisher;
use gearup::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let db = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(config.database_url.expose_secret())
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let addr = config.socket_addr();
    let state = AppState::new(db, config, events)?;
    if state.razorpay.is_none() {
        tracing::warn!("RAZORPAY_KEY_ID not set; online payment disabled");
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "GearUp listening");
    axum::serve(listener, gearup::app(state)).await?;
    Ok(())
}

//! Grocery Commerce - storefront, seller console and back-office API

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grocery_commerce::payments::{DisabledGateway, PaymentGateway, StripeGateway};
use grocery_commerce::publisher::EventPublisher;
use grocery_commerce::store::{MemoryStore, PgStore, Repository};
use grocery_commerce::{api, AppConfig, AppState};

const SHUTDOWN_DRAIN: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env()?;

    let repo = match config.database_url.as_deref() {
        Some(url) => Repository::new(Arc::new(PgStore::connect(url).await?)),
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Repository::new(Arc::new(MemoryStore::new()))
        }
    };

    let nats = match config.nats_url.as_deref() {
        Some(url) => match async_nats::connect(url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, domain events will not be published");
                None
            }
        },
        None => None,
    };

    let gateway: Arc<dyn PaymentGateway> = match config.payments.stripe_secret_key.as_deref() {
        Some(key) => Arc::new(StripeGateway::new(key, config.payments.currency.as_str())),
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set, online payments disabled");
            Arc::new(DisabledGateway)
        }
    };

    let port = config.port;
    let state = AppState::new(config, repo, gateway, EventPublisher::new(nats));
    let app = api::router(state.clone()).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());

    tracing::info!("Grocery Commerce listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await?;

    if tokio::time::timeout(SHUTDOWN_DRAIN, state.cart_sync().wait_idle()).await.is_err() {
        tracing::warn!("Cart writes still pending at shutdown");
    }
    Ok(())
}

use std::sync::Arc;

use papertrade::api::routes::{app_router, AppState};
use papertrade::config::Config;
use papertrade::executor::TradeExecutor;
use papertrade::oracle::{CoinGeckoOracle, PriceOracle};
use papertrade::persistence::{create_pool_and_migrate, PgStore};
use papertrade::store::{ExchangeStore, MemoryStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    let store: Arc<dyn ExchangeStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool_and_migrate(url)
                .await
                .expect("database connection failed");
            info!("connected to postgres");
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store; data will not survive restart");
            Arc::new(MemoryStore::new())
        }
    };

    let oracle: Arc<dyn PriceOracle> = Arc::new(CoinGeckoOracle::new(
        config.coingecko_url.clone(),
        config.price_cache_ttl,
    ));
    let executor = Arc::new(TradeExecutor::new(
        store.clone(),
        oracle.clone(),
        config.trading,
    ));

    let state = AppState {
        store,
        oracle,
        executor,
        jwt_secret: config.jwt_secret.clone(),
        starting_balance: config.trading.starting_balance,
    };

    let app = app_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");
    info!(%addr, "listening");
    axum::serve(listener, app).await.expect("server error");
}

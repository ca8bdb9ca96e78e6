use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use rust_decimal::Decimal;

use crate::api::handlers;
use crate::executor::TradeExecutor;
use crate::oracle::PriceOracle;
use crate::store::ExchangeStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ExchangeStore>,
    pub oracle: Arc<dyn PriceOracle>,
    pub executor: Arc<TradeExecutor>,
    pub jwt_secret: Vec<u8>,
    pub starting_balance: Decimal,
}

async fn health() -> &'static str {
    "healthy"
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/me", get(handlers::me))
        .route("/api/market/prices", get(handlers::all_prices))
        .route("/api/market/prices/{symbol}", get(handlers::price))
        .route("/api/market/supported", get(handlers::supported))
        .route("/api/trading/buy", post(handlers::buy))
        .route("/api/trading/sell", post(handlers::sell))
        .route("/api/trading/transactions", get(handlers::transactions))
        .with_state(state)
}

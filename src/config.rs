//! Runtime configuration, read once at startup from the environment.

use std::time::Duration;

use rust_decimal::Decimal;

const DEFAULT_FEE_RATE: &str = "0.001"; // 0.1% per trade, both directions
const DEFAULT_STARTING_BALANCE: &str = "10000";
const DEFAULT_CACHE_TTL_SECS: u64 = 30;
const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Absent means: run against the in-memory store (dev / tests).
    pub database_url: Option<String>,
    pub jwt_secret: Vec<u8>,
    pub trading: TradingConfig,
    pub coingecko_url: String,
    pub price_cache_ttl: Duration,
}

/// Static trading parameters: applied identically to every trade.
#[derive(Debug, Clone, Copy)]
pub struct TradingConfig {
    pub fee_rate: Decimal,
    pub starting_balance: Decimal,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);
        let jwt_secret = std::env::var("JWT_SECRET")
            .unwrap_or_else(|_| "dev-secret-change-me".to_string())
            .into_bytes();
        let fee_rate = env_decimal("FEE_RATE", DEFAULT_FEE_RATE);
        let starting_balance = env_decimal("STARTING_BALANCE", DEFAULT_STARTING_BALANCE);
        let price_cache_ttl = Duration::from_secs(
            std::env::var("PRICE_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CACHE_TTL_SECS),
        );
        let coingecko_url = std::env::var("COINGECKO_API_URL")
            .unwrap_or_else(|_| DEFAULT_COINGECKO_URL.to_string());

        Self {
            port,
            database_url: std::env::var("DATABASE_URL").ok(),
            jwt_secret,
            trading: TradingConfig {
                fee_rate,
                starting_balance,
            },
            coingecko_url,
            price_cache_ttl,
        }
    }
}

fn env_decimal(key: &str, default: &str) -> Decimal {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| default.parse().expect("valid default decimal"))
}

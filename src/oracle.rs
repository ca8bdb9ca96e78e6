//! Price oracle: the supported-asset catalog and a CoinGecko-backed client
//! with an instance-owned TTL cache. On upstream failure the cache is served
//! stale; with no cache at all the oracle reports unavailable.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::ExchangeError;

/// One tradable asset: provider id plus display data.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SupportedAsset {
    pub id: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
}

pub const SUPPORTED_ASSETS: &[SupportedAsset] = &[
    SupportedAsset { id: "bitcoin", symbol: "BTC", name: "Bitcoin" },
    SupportedAsset { id: "ethereum", symbol: "ETH", name: "Ethereum" },
    SupportedAsset { id: "tether", symbol: "USDT", name: "Tether" },
    SupportedAsset { id: "binancecoin", symbol: "BNB", name: "Binance Coin" },
    SupportedAsset { id: "cardano", symbol: "ADA", name: "Cardano" },
    SupportedAsset { id: "solana", symbol: "SOL", name: "Solana" },
    SupportedAsset { id: "ripple", symbol: "XRP", name: "Ripple" },
    SupportedAsset { id: "polkadot", symbol: "DOT", name: "Polkadot" },
    SupportedAsset { id: "dogecoin", symbol: "DOGE", name: "Dogecoin" },
    SupportedAsset { id: "avalanche-2", symbol: "AVAX", name: "Avalanche" },
    SupportedAsset { id: "chainlink", symbol: "LINK", name: "Chainlink" },
    SupportedAsset { id: "polygon", symbol: "MATIC", name: "Polygon" },
];

/// Catalog lookup by ticker, case-insensitive.
pub fn find_asset(symbol: &str) -> Option<&'static SupportedAsset> {
    SUPPORTED_ASSETS
        .iter()
        .find(|a| a.symbol.eq_ignore_ascii_case(symbol))
}

/// Current USD quote for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    pub change_24h: f64,
    pub volume_24h: f64,
}

/// Quote source consumed by the trade engine. Implementations may cache and
/// may serve stale data on upstream failure; `get_price` must fail fast
/// rather than block when no quote can be obtained.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn get_price(&self, symbol: &str) -> Result<Quote, ExchangeError>;
    async fn get_all_prices(&self) -> Result<Vec<Quote>, ExchangeError>;
}

struct CachedPrices {
    quotes: HashMap<String, Quote>,
    fetched_at: Instant,
}

/// CoinGecko `/simple/price` client. The cache lives on the instance, not in
/// a process-wide global, so tests can construct isolated oracles.
pub struct CoinGeckoOracle {
    client: reqwest::Client,
    base_url: String,
    ttl: Duration,
    cache: RwLock<Option<CachedPrices>>,
}

#[derive(Deserialize)]
struct RawPrice {
    usd: Decimal,
    #[serde(default)]
    usd_24h_change: f64,
    #[serde(default)]
    usd_24h_vol: f64,
}

impl CoinGeckoOracle {
    pub fn new(base_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// Current quote map, refreshed when the cache is older than the TTL.
    async fn snapshot(&self) -> Result<HashMap<String, Quote>, ExchangeError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < self.ttl {
                    return Ok(cached.quotes.clone());
                }
            }
        }

        match self.fetch().await {
            Ok(quotes) => {
                let mut cache = self.cache.write().await;
                *cache = Some(CachedPrices {
                    quotes: quotes.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(quotes)
            }
            Err(err) => {
                let cache = self.cache.read().await;
                match cache.as_ref() {
                    Some(cached) => {
                        warn!(error = %err, "price refresh failed, serving stale cache");
                        Ok(cached.quotes.clone())
                    }
                    None => Err(ExchangeError::OracleUnavailable(err.to_string())),
                }
            }
        }
    }

    async fn fetch(&self) -> Result<HashMap<String, Quote>, reqwest::Error> {
        let ids = SUPPORTED_ASSETS
            .iter()
            .map(|a| a.id)
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/simple/price", self.base_url);
        let response: HashMap<String, RawPrice> = self
            .client
            .get(&url)
            .query(&[
                ("ids", ids.as_str()),
                ("vs_currencies", "usd"),
                ("include_24hr_change", "true"),
                ("include_24hr_vol", "true"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut quotes = HashMap::new();
        for asset in SUPPORTED_ASSETS {
            if let Some(raw) = response.get(asset.id) {
                quotes.insert(
                    asset.symbol.to_string(),
                    Quote {
                        symbol: asset.symbol.to_string(),
                        name: asset.name.to_string(),
                        price: raw.usd,
                        change_24h: raw.usd_24h_change,
                        volume_24h: raw.usd_24h_vol,
                    },
                );
            }
        }
        Ok(quotes)
    }
}

#[async_trait]
impl PriceOracle for CoinGeckoOracle {
    async fn get_price(&self, symbol: &str) -> Result<Quote, ExchangeError> {
        let symbol = symbol.to_uppercase();
        if find_asset(&symbol).is_none() {
            return Err(ExchangeError::UnsupportedAsset(symbol));
        }
        let quotes = self.snapshot().await?;
        quotes
            .get(&symbol)
            .cloned()
            .ok_or(ExchangeError::UnsupportedAsset(symbol))
    }

    async fn get_all_prices(&self) -> Result<Vec<Quote>, ExchangeError> {
        let quotes = self.snapshot().await?;
        Ok(SUPPORTED_ASSETS
            .iter()
            .filter_map(|a| quotes.get(a.symbol).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_asset_is_case_insensitive() {
        assert_eq!(find_asset("btc").unwrap().name, "Bitcoin");
        assert_eq!(find_asset("BTC").unwrap().name, "Bitcoin");
        assert!(find_asset("WAGMI").is_none());
    }

    #[tokio::test]
    async fn unknown_symbol_rejected_without_network() {
        let oracle = CoinGeckoOracle::new("http://127.0.0.1:1", Duration::from_secs(30));
        let err = oracle.get_price("NOPE").await.unwrap_err();
        assert!(matches!(err, ExchangeError::UnsupportedAsset(_)));
    }
}

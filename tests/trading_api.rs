//! HTTP trading and market tests against a spawned app with a fake oracle.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use papertrade::api::routes::{app_router, AppState};
use papertrade::config::TradingConfig;
use papertrade::error::ExchangeError;
use papertrade::executor::TradeExecutor;
use papertrade::oracle::{PriceOracle, Quote};
use papertrade::store::{ExchangeStore, MemoryStore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

struct FakeOracle {
    prices: HashMap<String, Quote>,
}

impl FakeOracle {
    fn new() -> Self {
        let mut prices = HashMap::new();
        for (symbol, name, price) in [
            ("BTC", "Bitcoin", dec!(50000)),
            ("ETH", "Ethereum", dec!(3000)),
        ] {
            prices.insert(
                symbol.to_string(),
                Quote {
                    symbol: symbol.to_string(),
                    name: name.to_string(),
                    price,
                    change_24h: 1.5,
                    volume_24h: 1_000_000.0,
                },
            );
        }
        Self { prices }
    }
}

#[async_trait]
impl PriceOracle for FakeOracle {
    async fn get_price(&self, symbol: &str) -> Result<Quote, ExchangeError> {
        let symbol = symbol.to_uppercase();
        self.prices
            .get(&symbol)
            .cloned()
            .ok_or(ExchangeError::UnsupportedAsset(symbol))
    }

    async fn get_all_prices(&self) -> Result<Vec<Quote>, ExchangeError> {
        Ok(self.prices.values().cloned().collect())
    }
}

fn test_state() -> AppState {
    let store: Arc<dyn ExchangeStore> = Arc::new(MemoryStore::new());
    let oracle: Arc<dyn PriceOracle> = Arc::new(FakeOracle::new());
    let trading = TradingConfig {
        fee_rate: dec!(0.001),
        starting_balance: dec!(10000),
    };
    let executor = Arc::new(TradeExecutor::new(store.clone(), oracle.clone(), trading));
    AppState {
        store,
        oracle,
        executor,
        jwt_secret: b"test-jwt-secret".to_vec(),
        starting_balance: trading.starting_balance,
    }
}

async fn spawn_app(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let app = app_router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base_url, handle)
}

async fn register(client: &reqwest::Client, base_url: &str) -> String {
    let res = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&serde_json::json!({
            "email": format!("{}@example.com", uuid::Uuid::new_v4()),
            "password": "secret123",
            "name": "Trader"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 201);
    res.json::<serde_json::Value>().await.unwrap()["token"]
        .as_str()
        .unwrap()
        .to_string()
}

fn as_decimal(value: &serde_json::Value) -> Decimal {
    Decimal::from_str(value.as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn buy_returns_transaction_and_updated_user() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let client = reqwest::Client::new();
    let token = register(&client, &base_url).await;

    let res = client
        .post(format!("{}/api/trading/buy", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "symbol": "BTC", "amount": "0.01" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["message"].as_str(), Some("Purchase successful"));

    let tx = &json["transaction"];
    assert_eq!(tx["type"].as_str(), Some("BUY"));
    assert_eq!(tx["symbol"].as_str(), Some("BTC"));
    assert_eq!(tx["name"].as_str(), Some("Bitcoin"));
    assert_eq!(tx["status"].as_str(), Some("COMPLETED"));
    assert_eq!(as_decimal(&tx["total_value"]), dec!(500));
    assert_eq!(as_decimal(&tx["fee"]), dec!(0.50));

    let user = &json["user"];
    assert_eq!(as_decimal(&user["balance"]), dec!(9499.50));
    let portfolio = user["portfolio"].as_array().unwrap();
    assert_eq!(portfolio.len(), 1);
    assert_eq!(portfolio[0]["symbol"].as_str(), Some("BTC"));
    assert_eq!(as_decimal(&portfolio[0]["amount"]), dec!(0.01));
    assert_eq!(as_decimal(&portfolio[0]["average_price"]), dec!(50000));
}

#[tokio::test]
async fn trading_requires_authentication() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/trading/buy", base_url))
        .json(&serde_json::json!({ "symbol": "BTC", "amount": "0.01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn buy_unknown_symbol_returns_400() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let client = reqwest::Client::new();
    let token = register(&client, &base_url).await;

    let res = client
        .post(format!("{}/api/trading/buy", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "symbol": "WAGMI", "amount": "1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("not supported"));
}

#[tokio::test]
async fn buy_beyond_balance_returns_400() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let client = reqwest::Client::new();
    let token = register(&client, &base_url).await;

    let res = client
        .post(format!("{}/api/trading/buy", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "symbol": "BTC", "amount": "1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("insufficient balance"));
}

#[tokio::test]
async fn sell_without_position_returns_400() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let client = reqwest::Client::new();
    let token = register(&client, &base_url).await;

    let res = client
        .post(format!("{}/api/trading/sell", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "symbol": "ETH", "amount": "1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("no position"));
}

#[tokio::test]
async fn transactions_endpoint_pages_newest_first() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let client = reqwest::Client::new();
    let token = register(&client, &base_url).await;

    for body in [
        serde_json::json!({ "symbol": "BTC", "amount": "0.01" }),
        serde_json::json!({ "symbol": "ETH", "amount": "1" }),
    ] {
        let res = client
            .post(format!("{}/api/trading/buy", base_url))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 200);
    }
    let res = client
        .post(format!("{}/api/trading/sell", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "symbol": "ETH", "amount": "1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let res = client
        .get(format!("{}/api/trading/transactions", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["total"].as_u64(), Some(3));
    assert_eq!(json["limit"].as_i64(), Some(50));
    let transactions = json["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 3);
    assert_eq!(transactions[0]["type"].as_str(), Some("SELL"));

    let res = client
        .get(format!(
            "{}/api/trading/transactions?limit=1&offset=2",
            base_url
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["total"].as_u64(), Some(3));
    let page = json["transactions"].as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["type"].as_str(), Some("BUY"));
    assert_eq!(page[0]["symbol"].as_str(), Some("BTC"));
}

#[tokio::test]
async fn market_prices_are_public() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/market/prices", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json["prices"]["BTC"].is_object());
    assert!(json["prices"]["ETH"].is_object());

    let res = client
        .get(format!("{}/api/market/prices/btc", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["price"]["symbol"].as_str(), Some("BTC"));
    assert_eq!(as_decimal(&json["price"]["price"]), dec!(50000));
}

#[tokio::test]
async fn market_price_unknown_symbol_returns_404() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let res = reqwest::get(format!("{}/api/market/prices/WAGMI", base_url))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn supported_assets_are_listed() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let res = reqwest::get(format!("{}/api/market/supported", base_url))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    let assets = json["cryptocurrencies"].as_array().unwrap();
    assert_eq!(assets.len(), 12);
    assert!(assets.iter().any(|a| a["symbol"].as_str() == Some("BTC")));
}

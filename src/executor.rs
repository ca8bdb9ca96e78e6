//! Trade execution: one request in, one committed trade (or one clean
//! rejection) out.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::TradingConfig;
use crate::error::ExchangeError;
use crate::ledger;
use crate::oracle::PriceOracle;
use crate::store::ExchangeStore;
use crate::types::{TradeKind, Transaction, User};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// Reloads and retries this many times when a concurrent trade wins the
/// version race before giving up with `PersistenceConflict`.
const MAX_COMMIT_ATTEMPTS: u32 = 5;

/// A committed trade: the ledger entry plus the user snapshot it produced.
#[derive(Debug)]
pub struct TradeReceipt {
    pub transaction: Transaction,
    pub user: User,
}

pub struct TradeExecutor {
    store: Arc<dyn ExchangeStore>,
    oracle: Arc<dyn PriceOracle>,
    config: TradingConfig,
}

impl TradeExecutor {
    pub fn new(
        store: Arc<dyn ExchangeStore>,
        oracle: Arc<dyn PriceOracle>,
        config: TradingConfig,
    ) -> Self {
        Self {
            store,
            oracle,
            config,
        }
    }

    pub async fn buy(
        &self,
        user_id: Uuid,
        symbol: &str,
        amount: Decimal,
    ) -> Result<TradeReceipt, ExchangeError> {
        self.execute(user_id, TradeKind::Buy, symbol, amount).await
    }

    pub async fn sell(
        &self,
        user_id: Uuid,
        symbol: &str,
        amount: Decimal,
    ) -> Result<TradeReceipt, ExchangeError> {
        self.execute(user_id, TradeKind::Sell, symbol, amount).await
    }

    /// Validate, quote, apply the ledger math, and commit. The commit is a
    /// compare-and-swap on the user version; losing the race reruns the whole
    /// load-mutate-save cycle so no trade ever works from a stale snapshot.
    async fn execute(
        &self,
        user_id: Uuid,
        kind: TradeKind,
        symbol: &str,
        amount: Decimal,
    ) -> Result<TradeReceipt, ExchangeError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ExchangeError::InvalidRequest(
                "symbol is required".to_string(),
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(ExchangeError::InvalidRequest(
                "amount must be positive".to_string(),
            ));
        }

        let quote = self.oracle.get_price(&symbol).await?;

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let user = self
                .store
                .load_user(user_id)
                .await?
                .ok_or(ExchangeError::UserNotFound(user_id))?;

            let (updated, notional, fee) = match kind {
                TradeKind::Buy => {
                    let outcome = ledger::apply_buy(
                        &user,
                        &symbol,
                        &quote.name,
                        amount,
                        quote.price,
                        self.config.fee_rate,
                    )?;
                    (outcome.user, outcome.total_cost, outcome.fee)
                }
                TradeKind::Sell => {
                    let outcome = ledger::apply_sell(
                        &user,
                        &symbol,
                        amount,
                        quote.price,
                        self.config.fee_rate,
                    )?;
                    (outcome.user, outcome.total_value, outcome.fee)
                }
            };

            let transaction = Transaction::completed(
                user_id,
                kind,
                &symbol,
                &quote.name,
                amount,
                quote.price,
                notional,
                fee,
            );

            match self.store.commit_trade(&updated, &transaction).await {
                Ok(()) => {
                    info!(
                        user = %user_id,
                        kind = kind.as_str(),
                        %symbol,
                        %amount,
                        price = %quote.price,
                        "trade committed"
                    );
                    let mut user = updated;
                    user.version += 1;
                    return Ok(TradeReceipt { transaction, user });
                }
                Err(ExchangeError::PersistenceConflict) if attempt < MAX_COMMIT_ATTEMPTS => {
                    warn!(user = %user_id, attempt, "commit lost version race, retrying");
                }
                Err(err) => return Err(err),
            }
        }

        Err(ExchangeError::PersistenceConflict)
    }

    /// Newest-first page of a user's transactions plus the unfiltered total.
    /// Limit is clamped to 1..=200, defaulting to 50.
    pub async fn transactions(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<(Vec<Transaction>, u64), ExchangeError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0).max(0);
        self.store.list_transactions(user_id, limit, offset).await
    }
}

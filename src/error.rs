use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the trade engine. Callers branch on the variant, not
/// the message.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Malformed caller input (empty symbol, non-positive amount).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Symbol is not in the supported-asset catalog (or the provider has no
    /// data for it).
    #[error("cryptocurrency not supported: {0}")]
    UnsupportedAsset(String),

    /// Cash balance cannot cover cost plus fee.
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    /// Sell against a symbol the user does not hold.
    #[error("no position in {0}")]
    NoSuchPosition(String),

    /// Sell amount exceeds the held amount.
    #[error("insufficient {symbol} holdings: requested {requested}, held {held}")]
    InsufficientHoldings {
        symbol: String,
        requested: Decimal,
        held: Decimal,
    },

    /// Unknown user id. Unreachable for authenticated callers.
    #[error("user not found: {0}")]
    UserNotFound(Uuid),

    /// Price provider failed and no cached data exists.
    #[error("price data unavailable: {0}")]
    OracleUnavailable(String),

    /// Concurrent write detected (version mismatch on save).
    #[error("conflicting concurrent update")]
    PersistenceConflict,

    /// Underlying store failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ExchangeError {
    /// Business-rule rejections: the caller can correct input and retry.
    /// Everything else is either transient or internal.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ExchangeError::InvalidRequest(_)
                | ExchangeError::UnsupportedAsset(_)
                | ExchangeError::InsufficientFunds { .. }
                | ExchangeError::NoSuchPosition(_)
                | ExchangeError::InsufficientHoldings { .. }
        )
    }
}

impl From<sqlx::Error> for ExchangeError {
    fn from(err: sqlx::Error) -> Self {
        ExchangeError::Storage(err.to_string())
    }
}

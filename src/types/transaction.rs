use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeKind {
    Buy,
    Sell,
}

impl TradeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeKind::Buy => "BUY",
            TradeKind::Sell => "SELL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(TradeKind::Buy),
            "SELL" => Some(TradeKind::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Completed,
    Failed,
    Pending,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Pending => "PENDING",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "COMPLETED" => Some(TransactionStatus::Completed),
            "FAILED" => Some(TransactionStatus::Failed),
            "PENDING" => Some(TransactionStatus::Pending),
            _ => None,
        }
    }
}

/// Immutable record of one executed trade. `total_value` is the pre-fee
/// notional (`amount * price`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: TradeKind,
    pub symbol: String,
    pub name: String,
    pub amount: Decimal,
    pub price: Decimal,
    pub total_value: Decimal,
    pub fee: Decimal,
    pub status: TransactionStatus,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn completed(
        user_id: Uuid,
        kind: TradeKind,
        symbol: &str,
        name: &str,
        amount: Decimal,
        price: Decimal,
        total_value: Decimal,
        fee: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            symbol: symbol.to_string(),
            name: name.to_string(),
            amount,
            price,
            total_value,
            fee,
            status: TransactionStatus::Completed,
            timestamp: Utc::now(),
        }
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A holding of one asset. Never stored with `amount == 0`; a position that
/// reaches zero is removed from the portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub name: String,
    pub amount: Decimal,
    pub average_price: Decimal,
}

/// User record: cash balance plus portfolio, unique per symbol.
/// `version` guards concurrent read-modify-write saves (compare-and-swap).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub balance: Decimal,
    pub portfolio: Vec<Position>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, name: String, password_hash: String, balance: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            password_hash,
            balance,
            portfolio: Vec::new(),
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.portfolio.iter().find(|p| p.symbol == symbol)
    }
}

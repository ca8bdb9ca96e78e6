//! Transaction persistence: append on commit, newest-first listing for the API.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction as DbTransaction};
use uuid::Uuid;

use crate::error::ExchangeError;
use crate::types::{TradeKind, Transaction, TransactionStatus};

#[derive(FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    symbol: String,
    name: String,
    amount: Decimal,
    price: Decimal,
    total_value: Decimal,
    fee: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

fn row_to_transaction(row: TransactionRow) -> Result<Transaction, ExchangeError> {
    let kind = TradeKind::parse(&row.kind)
        .ok_or_else(|| ExchangeError::Storage(format!("bad trade kind in row: {}", row.kind)))?;
    let status = TransactionStatus::parse(&row.status).ok_or_else(|| {
        ExchangeError::Storage(format!("bad transaction status in row: {}", row.status))
    })?;
    Ok(Transaction {
        id: row.id,
        user_id: row.user_id,
        kind,
        symbol: row.symbol,
        name: row.name,
        amount: row.amount,
        price: row.price,
        total_value: row.total_value,
        fee: row.fee,
        status,
        timestamp: row.created_at,
    })
}

/// Append a transaction inside the commit's database transaction.
pub(crate) async fn insert_transaction(
    db_tx: &mut DbTransaction<'_, Postgres>,
    tx: &Transaction,
) -> Result<(), ExchangeError> {
    sqlx::query(
        "INSERT INTO transactions \
         (id, user_id, kind, symbol, name, amount, price, total_value, fee, status, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(tx.id)
    .bind(tx.user_id)
    .bind(tx.kind.as_str())
    .bind(&tx.symbol)
    .bind(&tx.name)
    .bind(tx.amount)
    .bind(tx.price)
    .bind(tx.total_value)
    .bind(tx.fee)
    .bind(tx.status.as_str())
    .bind(tx.timestamp)
    .execute(&mut **db_tx)
    .await?;
    Ok(())
}

/// Page of a user's transactions, newest first. `seq` breaks timestamp ties
/// in append order.
pub async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Transaction>, u64), ExchangeError> {
    let rows = sqlx::query_as::<_, TransactionRow>(
        "SELECT id, user_id, kind, symbol, name, amount, price, total_value, fee, status, created_at \
         FROM transactions WHERE user_id = $1 \
         ORDER BY created_at DESC, seq DESC LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let transactions = rows
        .into_iter()
        .map(row_to_transaction)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((transactions, total as u64))
}

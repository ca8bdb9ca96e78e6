//! User persistence: load with portfolio, insert, and the versioned save.
//! Emails are stored lowercase.

use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction as DbTransaction};
use uuid::Uuid;

use crate::error::ExchangeError;
use crate::types::{Position, User};

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    balance: Decimal,
    version: i64,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(FromRow)]
struct PositionRow {
    symbol: String,
    name: String,
    amount: Decimal,
    average_price: Decimal,
}

async fn hydrate(pool: &PgPool, row: UserRow) -> Result<User, ExchangeError> {
    // `slot` preserves acquisition order across full-replace saves.
    let positions = sqlx::query_as::<_, PositionRow>(
        "SELECT symbol, name, amount, average_price FROM positions \
         WHERE user_id = $1 ORDER BY slot",
    )
    .bind(row.id)
    .fetch_all(pool)
    .await?;

    Ok(User {
        id: row.id,
        email: row.email,
        name: row.name,
        password_hash: row.password_hash,
        balance: row.balance,
        portfolio: positions
            .into_iter()
            .map(|p| Position {
                symbol: p.symbol,
                name: p.name,
                amount: p.amount,
                average_price: p.average_price,
            })
            .collect(),
        version: row.version,
        created_at: row.created_at,
    })
}

pub async fn get_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, ExchangeError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, name, password_hash, balance, version, created_at \
         FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(hydrate(pool, row).await?)),
        None => Ok(None),
    }
}

pub async fn get_user_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<User>, ExchangeError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, name, password_hash, balance, version, created_at \
         FROM users WHERE email = $1",
    )
    .bind(email.to_lowercase())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(hydrate(pool, row).await?)),
        None => Ok(None),
    }
}

pub async fn insert_user(pool: &PgPool, user: &User) -> Result<(), ExchangeError> {
    let result = sqlx::query(
        "INSERT INTO users (id, email, name, password_hash, balance, version, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.password_hash)
    .bind(user.balance)
    .bind(user.version)
    .bind(user.created_at)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(err) => {
            if err
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                Err(ExchangeError::InvalidRequest(
                    "email already registered".to_string(),
                ))
            } else {
                Err(err.into())
            }
        }
    }
}

/// Replace balance and portfolio, guarded by the version the caller loaded.
/// Returns false when the version no longer matches (concurrent trade won).
pub(crate) async fn save_user_cas(
    db_tx: &mut DbTransaction<'_, Postgres>,
    user: &User,
) -> Result<bool, ExchangeError> {
    let conn: &mut PgConnection = &mut *db_tx;
    let updated = sqlx::query(
        "UPDATE users SET balance = $2, version = version + 1 \
         WHERE id = $1 AND version = $3",
    )
    .bind(user.id)
    .bind(user.balance)
    .bind(user.version)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if updated == 0 {
        return Ok(false);
    }

    sqlx::query("DELETE FROM positions WHERE user_id = $1")
        .bind(user.id)
        .execute(&mut *conn)
        .await?;
    for (slot, position) in user.portfolio.iter().enumerate() {
        sqlx::query(
            "INSERT INTO positions (user_id, slot, symbol, name, amount, average_price) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(slot as i32)
        .bind(&position.symbol)
        .bind(&position.name)
        .bind(position.amount)
        .bind(position.average_price)
        .execute(&mut *conn)
        .await?;
    }
    Ok(true)
}

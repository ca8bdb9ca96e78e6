//! Database layer: pool, migrations, and the Postgres-backed store.

mod pool;
mod transactions;
mod users;

pub use pool::{create_pool_and_migrate, run_migrations};
pub use sqlx::PgPool;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ExchangeError;
use crate::store::ExchangeStore;
use crate::types::{Transaction, User};

/// Postgres implementation of the storage seam. The user save and the
/// transaction append share one database transaction, so a trade is either
/// fully durable or absent.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExchangeStore for PgStore {
    async fn load_user(&self, id: Uuid) -> Result<Option<User>, ExchangeError> {
        users::get_user_by_id(&self.pool, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ExchangeError> {
        users::get_user_by_email(&self.pool, email).await
    }

    async fn insert_user(&self, user: &User) -> Result<(), ExchangeError> {
        users::insert_user(&self.pool, user).await
    }

    async fn commit_trade(&self, user: &User, tx: &Transaction) -> Result<(), ExchangeError> {
        let mut db_tx = self.pool.begin().await?;
        let swapped = users::save_user_cas(&mut db_tx, user).await?;
        if !swapped {
            db_tx.rollback().await?;
            return Err(ExchangeError::PersistenceConflict);
        }
        transactions::insert_transaction(&mut db_tx, tx).await?;
        db_tx.commit().await?;
        Ok(())
    }

    async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Transaction>, u64), ExchangeError> {
        transactions::list_for_user(&self.pool, user_id, limit, offset).await
    }
}

//! Storage seam for the trade engine, plus the in-memory implementation used
//! by tests and database-less dev runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ExchangeError;
use crate::types::{Transaction, User};

/// User record store plus append-only transaction log.
///
/// `commit_trade` is the one durable step a trade performs: replace the
/// user's balance and portfolio and append the transaction record as a
/// single unit. The write is guarded by the version the caller loaded;
/// a mismatch means a concurrent trade won and the caller must reload.
#[async_trait]
pub trait ExchangeStore: Send + Sync {
    async fn load_user(&self, id: Uuid) -> Result<Option<User>, ExchangeError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ExchangeError>;

    /// Insert a new user. Email must be unique.
    async fn insert_user(&self, user: &User) -> Result<(), ExchangeError>;

    /// Persist the updated user (full replace of balance + portfolio, version
    /// compare-and-swap) and append the transaction, atomically.
    async fn commit_trade(&self, user: &User, tx: &Transaction) -> Result<(), ExchangeError>;

    /// Page of a user's transactions, newest first, plus the unfiltered total.
    async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Transaction>, u64), ExchangeError>;
}

#[derive(Default)]
struct MemoryInner {
    users: HashMap<Uuid, User>,
    transactions: Vec<Transaction>,
}

/// In-memory store. One lock over users and the log keeps `commit_trade`
/// atomic without further coordination.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExchangeStore for MemoryStore {
    async fn load_user(&self, id: Uuid) -> Result<Option<User>, ExchangeError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ExchangeError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), ExchangeError> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(ExchangeError::InvalidRequest(
                "email already registered".to_string(),
            ));
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn commit_trade(&self, user: &User, tx: &Transaction) -> Result<(), ExchangeError> {
        let mut inner = self.inner.write().await;
        let current = inner
            .users
            .get(&user.id)
            .ok_or(ExchangeError::UserNotFound(user.id))?;
        if current.version != user.version {
            return Err(ExchangeError::PersistenceConflict);
        }
        let mut saved = user.clone();
        saved.version += 1;
        inner.users.insert(saved.id, saved);
        inner.transactions.push(tx.clone());
        Ok(())
    }

    async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Transaction>, u64), ExchangeError> {
        let inner = self.inner.read().await;
        let all: Vec<&Transaction> = inner
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .collect();
        let total = all.len() as u64;
        let page = all
            .into_iter()
            .rev()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }
}

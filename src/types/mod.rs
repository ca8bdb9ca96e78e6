pub mod transaction;
pub mod user;

pub use transaction::{Transaction, TradeKind, TransactionStatus};
pub use user::{Position, User};

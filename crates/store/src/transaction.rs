//! Transaction handles and the stores that open them.

use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

use crate::Result;
use crate::repository::{OrderRepository, ProductRepository, TagRepository};

/// Isolation level applied to every transaction a store opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Combined with row locks on the referenced products, concurrent orders
    /// for the same product wait for each other instead of failing.
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "read_committed",
            IsolationLevel::RepeatableRead => "repeatable_read",
            IsolationLevel::Serializable => "serializable",
        }
    }

    /// The statement that must run first inside a PostgreSQL transaction.
    pub fn set_transaction_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "SET TRANSACTION ISOLATION LEVEL READ COMMITTED",
            IsolationLevel::RepeatableRead => "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ",
            IsolationLevel::Serializable => "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE",
        }
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown isolation level: {0}")]
pub struct ParseIsolationLevelError(pub String);

impl FromStr for IsolationLevel {
    type Err = ParseIsolationLevelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "read_committed" => Ok(IsolationLevel::ReadCommitted),
            "repeatable_read" => Ok(IsolationLevel::RepeatableRead),
            "serializable" => Ok(IsolationLevel::Serializable),
            _ => Err(ParseIsolationLevelError(s.to_string())),
        }
    }
}

/// An open transaction.
///
/// Dropping a transaction without calling [`Transaction::commit`] rolls it
/// back.
#[async_trait]
pub trait Transaction: ProductRepository + TagRepository + OrderRepository {
    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// A transactional database handle.
#[async_trait]
pub trait Store: Send + Sync {
    type Tx: Transaction;

    /// Short backend name, reported by the health endpoint.
    fn backend(&self) -> &'static str;

    /// Opens a transaction at the store's isolation level.
    async fn begin(&self) -> Result<Self::Tx>;
}

//! Persistence for products, tags and orders.
//!
//! All access goes through a [`Transaction`] obtained from a [`Store`]. The
//! PostgreSQL store is the production backend; [`InMemoryStore`] implements
//! the same traits for tests and local demos.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod transaction;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTransaction};
pub use postgres::{PostgresStore, PostgresTransaction};
pub use repository::{
    OrderRepository, PRODUCT_NAME_CONSTRAINT, PRODUCT_STOCK_CONSTRAINT, ProductRepository,
    TAG_NAME_CONSTRAINT, TagRepository,
};
pub use transaction::{IsolationLevel, ParseIsolationLevelError, Store, Transaction};

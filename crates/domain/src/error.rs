//! Domain error types.

use store::StoreError;
use thiserror::Error;

use crate::order::OrderError;
use crate::product::ProductError;

/// Errors that can occur during domain operations.
///
/// Business rule violations display their own message unchanged so callers
/// can show it to staff as is.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An order was rejected.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// A product or tag command was rejected.
    #[error(transparent)]
    Product(#[from] ProductError),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DomainError {
    /// Short label used for failure metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            DomainError::Order(OrderError::ProductNotFound { .. }) => "product_not_found",
            DomainError::Order(OrderError::InsufficientStock { .. }) => "insufficient_stock",
            DomainError::Order(OrderError::OrderNotFound { .. }) => "order_not_found",
            DomainError::Order(OrderError::InvalidStatusTransition { .. }) => "invalid_transition",
            DomainError::Order(_) => "validation",
            DomainError::Product(ProductError::NotFound { .. }) => "product_not_found",
            DomainError::Product(ProductError::DuplicateName { .. }) => "duplicate_name",
            DomainError::Product(ProductError::LimitReached { .. }) => "limit_reached",
            DomainError::Product(_) => "validation",
            DomainError::Store(StoreError::Conflict(_)) => "conflict",
            DomainError::Store(_) => "store",
        }
    }
}

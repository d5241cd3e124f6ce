//! Order service providing the order operations to callers.

use std::time::Instant;

use chrono::Utc;
use common::{Order, OrderId, OrderQuery};
use store::{OrderRepository, Store, Transaction};

use super::OrderError;
use super::commands::{RegisterOrder, SetOrderStatus};
use super::placement::place_order;
use crate::error::DomainError;
use crate::transaction::finish;

/// Service for placing and managing orders.
///
/// Every operation runs in its own store transaction. Nothing is retried: a
/// rejected order must be submitted again by the caller.
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places an order, decrementing stock for every line.
    ///
    /// Either the order is persisted and all stock is decremented, or nothing
    /// changes. Fails with [`OrderError::ProductNotFound`] when a line refers
    /// to an unknown product and with [`OrderError::InsufficientStock`] when a
    /// line asks for more than is left.
    #[tracing::instrument(skip(self, cmd), fields(lines = cmd.order_items.len()))]
    pub async fn register_order(&self, cmd: RegisterOrder) -> Result<Order, DomainError> {
        metrics::counter!("order_registrations_total").increment(1);
        let started = Instant::now();

        let result = self.try_register_order(cmd).await;

        metrics::histogram!("order_registration_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(order) => {
                metrics::counter!("orders_registered_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    items = order.items.len(),
                    total_amount = %order.total_amount,
                    "order registered"
                );
            }
            Err(err) => {
                metrics::counter!("order_registration_failures_total", "reason" => err.reason())
                    .increment(1);
                tracing::warn!(error = %err, reason = err.reason(), "order rejected");
            }
        }

        result
    }

    async fn try_register_order(&self, cmd: RegisterOrder) -> Result<Order, DomainError> {
        let order = cmd.validate()?;

        let mut tx = self.store.begin().await?;
        let result = place_order(&mut tx, order, Utc::now()).await;
        finish(tx, result).await
    }

    /// Moves an order to another status.
    #[tracing::instrument(skip(self))]
    pub async fn set_order_status(&self, cmd: SetOrderStatus) -> Result<Order, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = apply_status(&mut tx, cmd).await;
        let result = finish(tx, result).await;

        match &result {
            Ok(order) => {
                metrics::counter!("order_status_updates_total", "status" => order.status.as_str())
                    .increment(1);
                tracing::info!(order_id = %order.id, status = %order.status, "order status updated");
            }
            Err(err) => {
                tracing::warn!(error = %err, "order status update rejected");
            }
        }

        result
    }

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: OrderId) -> Result<Option<Order>, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = tx.find_order_by_id(id).await.map_err(DomainError::from);
        finish(tx, result).await
    }

    /// Lists orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_orders(query).await.map_err(DomainError::from);
        finish(tx, result).await
    }
}

async fn apply_status<T: Transaction>(
    tx: &mut T,
    cmd: SetOrderStatus,
) -> Result<Order, DomainError> {
    let not_found = || OrderError::OrderNotFound { order_id: cmd.id };

    let current = tx.find_order_by_id(cmd.id).await?.ok_or_else(not_found)?;

    if !current.status.can_transition_to(cmd.status) {
        return Err(OrderError::InvalidStatusTransition {
            from: current.status,
            to: cmd.status,
        }
        .into());
    }
    if current.status == cmd.status {
        return Ok(current);
    }

    let updated = tx
        .update_order_status(cmd.id, cmd.status)
        .await?
        .ok_or_else(not_found)?;
    Ok(updated)
}

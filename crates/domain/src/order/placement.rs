//! The order placement transaction.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use common::{
    Money, NewOrder, Order, OrderItem, OrderStatus, Pagination, Product, ProductId, ProductUpdate,
};
use store::Transaction;

use super::OrderError;
use super::commands::ValidOrder;
use crate::error::DomainError;

/// Upper bound of the bulk product fetch. No order can reference more
/// products than the store holds.
pub const PRODUCT_LIMIT: u32 = 1000;

/// Places `order` inside `tx`.
///
/// Steps, in order:
/// 1. lock and load every referenced product in one fetch
/// 2. resolve each line, failing before any write if a product is missing
/// 3. snapshot name and price into the items
/// 4. decrement stock line by line, failing on the first line that would go
///    negative
/// 5. insert the order with its computed total
///
/// On error the caller must roll `tx` back: earlier decrements have already
/// been written inside it.
pub(crate) async fn place_order<T: Transaction>(
    tx: &mut T,
    order: ValidOrder,
    now: DateTime<Utc>,
) -> Result<Order, DomainError> {
    let ids: Vec<ProductId> = order
        .lines
        .iter()
        .map(|(id, _)| *id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    tx.lock_products(&ids).await?;
    let products = tx
        .find_products_by_ids(&ids, Pagination::first(PRODUCT_LIMIT))
        .await?;
    let mut products: HashMap<ProductId, Product> =
        products.into_iter().map(|p| (p.id, p)).collect();

    let items = snapshot_items(&order.lines, &products)?;

    for item in &items {
        let Some(product) = products.get_mut(&item.product_id) else {
            return Err(OrderError::ProductNotFound {
                product_id: item.product_id,
            }
            .into());
        };

        let insufficient = || OrderError::InsufficientStock {
            product_id: item.product_id,
            requested: item.quantity,
        };

        let new_stock = product.stock - i64::from(item.quantity);
        if new_stock < 0 {
            tracing::debug!(
                product_id = %item.product_id,
                stock = product.stock,
                requested = item.quantity,
                "insufficient stock"
            );
            return Err(insufficient().into());
        }

        // A missing row here means the product vanished mid-transaction.
        let updated = tx
            .update_product(item.product_id, ProductUpdate::stock(new_stock))
            .await?
            .ok_or_else(insufficient)?;

        // Carry the new stock forward so repeated lines for one product are
        // all charged.
        product.stock = updated.stock;
    }

    let total_amount = total_amount(&items)?;

    let created = tx
        .create_order(NewOrder {
            customer_name: order.customer_name,
            comment: order.comment,
            created_at: now,
            status: OrderStatus::Pending,
            total_amount,
            items,
        })
        .await?;

    Ok(created)
}

/// Builds order items with the current name and price of each product.
fn snapshot_items(
    lines: &[(ProductId, u32)],
    products: &HashMap<ProductId, Product>,
) -> Result<Vec<OrderItem>, OrderError> {
    lines
        .iter()
        .map(|&(product_id, quantity)| {
            let product = products
                .get(&product_id)
                .ok_or(OrderError::ProductNotFound { product_id })?;
            Ok(OrderItem::new(
                product.id,
                product.name.clone(),
                product.price,
                quantity,
            ))
        })
        .collect()
}

/// Sum of `unit_amount * quantity` over all items.
pub(crate) fn total_amount(items: &[OrderItem]) -> Result<Money, OrderError> {
    items.iter().try_fold(Money::zero(), |total, item| {
        item.subtotal()
            .and_then(|subtotal| total.checked_add(subtotal))
            .ok_or(OrderError::AmountOverflow)
    })
}

#[cfg(test)]
mod tests {
    use store::{OrderRepository, ProductRepository, TagRepository};

    use super::*;

    fn product(id: i64, name: &str, price: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Money::from_yen(price),
            stock,
            tag_ids: vec![],
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_total_amount_sums_subtotals() {
        let items = vec![
            OrderItem::new(ProductId::new(1), "Ramen", Money::from_yen(100), 2),
            OrderItem::new(ProductId::new(2), "Gyoza", Money::from_yen(200), 1),
        ];
        assert_eq!(total_amount(&items).unwrap(), Money::from_yen(400));
        assert_eq!(total_amount(&[]).unwrap(), Money::zero());
    }

    #[test]
    fn test_total_amount_overflow_is_an_error() {
        let items = vec![
            OrderItem::new(ProductId::new(1), "A", Money::from_yen(i64::MAX / 2), 1),
            OrderItem::new(ProductId::new(2), "B", Money::from_yen(i64::MAX / 2), 1),
            OrderItem::new(ProductId::new(3), "C", Money::from_yen(10), 1),
        ];
        assert!(matches!(
            total_amount(&items),
            Err(OrderError::AmountOverflow)
        ));
    }

    #[test]
    fn test_snapshot_copies_name_and_price() {
        let products: HashMap<_, _> = [product(1, "Ramen", 900, 5)]
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let items = snapshot_items(&[(ProductId::new(1), 2)], &products).unwrap();
        assert_eq!(
            items,
            vec![OrderItem::new(
                ProductId::new(1),
                "Ramen",
                Money::from_yen(900),
                2
            )]
        );
    }

    #[test]
    fn test_snapshot_reports_missing_product() {
        let products: HashMap<_, _> = [product(1, "Ramen", 900, 5)]
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let err = snapshot_items(
            &[(ProductId::new(1), 1), (ProductId::new(999), 1)],
            &products,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            OrderError::ProductNotFound { product_id } if product_id == ProductId::new(999)
        ));
    }

    /// Wraps an in-memory transaction but reports every stock write as
    /// hitting no row, as when a product is deleted between the fetch and
    /// the decrement.
    struct VanishingRowTx {
        inner: store::InMemoryTransaction,
        orders_created: usize,
    }

    #[async_trait::async_trait]
    impl ProductRepository for VanishingRowTx {
        async fn find_products_by_ids(
            &mut self,
            ids: &[ProductId],
            pagination: Pagination,
        ) -> store::Result<Vec<Product>> {
            self.inner.find_products_by_ids(ids, pagination).await
        }

        async fn lock_products(&mut self, ids: &[ProductId]) -> store::Result<()> {
            self.inner.lock_products(ids).await
        }

        async fn find_product_by_id(&mut self, id: ProductId) -> store::Result<Option<Product>> {
            self.inner.find_product_by_id(id).await
        }

        async fn find_product_by_name(&mut self, name: &str) -> store::Result<Option<Product>> {
            self.inner.find_product_by_name(name).await
        }

        async fn list_products(&mut self, pagination: Pagination) -> store::Result<Vec<Product>> {
            self.inner.list_products(pagination).await
        }

        async fn count_products(&mut self) -> store::Result<u64> {
            self.inner.count_products().await
        }

        async fn create_product(&mut self, product: common::NewProduct) -> store::Result<Product> {
            self.inner.create_product(product).await
        }

        async fn update_product(
            &mut self,
            id: ProductId,
            update: ProductUpdate,
        ) -> store::Result<Option<Product>> {
            if update.stock.is_some() {
                return Ok(None);
            }
            self.inner.update_product(id, update).await
        }

        async fn delete_product(&mut self, id: ProductId) -> store::Result<bool> {
            self.inner.delete_product(id).await
        }
    }

    #[async_trait::async_trait]
    impl TagRepository for VanishingRowTx {
        async fn find_tags_by_names(
            &mut self,
            names: &[String],
        ) -> store::Result<Vec<common::ProductTag>> {
            self.inner.find_tags_by_names(names).await
        }

        async fn create_tag(&mut self, name: &str) -> store::Result<common::ProductTag> {
            self.inner.create_tag(name).await
        }

        async fn list_tags(&mut self) -> store::Result<Vec<common::ProductTag>> {
            self.inner.list_tags().await
        }

        async fn delete_orphan_tags(&mut self) -> store::Result<Vec<common::TagId>> {
            self.inner.delete_orphan_tags().await
        }
    }

    #[async_trait::async_trait]
    impl OrderRepository for VanishingRowTx {
        async fn create_order(&mut self, order: NewOrder) -> store::Result<Order> {
            self.orders_created += 1;
            self.inner.create_order(order).await
        }

        async fn find_order_by_id(&mut self, id: common::OrderId) -> store::Result<Option<Order>> {
            self.inner.find_order_by_id(id).await
        }

        async fn list_orders(&mut self, query: common::OrderQuery) -> store::Result<Vec<Order>> {
            self.inner.list_orders(query).await
        }

        async fn update_order_status(
            &mut self,
            id: common::OrderId,
            status: OrderStatus,
        ) -> store::Result<Option<Order>> {
            self.inner.update_order_status(id, status).await
        }
    }

    #[async_trait::async_trait]
    impl Transaction for VanishingRowTx {
        async fn commit(self) -> store::Result<()> {
            self.inner.commit().await
        }

        async fn rollback(self) -> store::Result<()> {
            self.inner.rollback().await
        }
    }

    #[tokio::test]
    async fn test_vanished_row_on_decrement_is_insufficient_stock() {
        use store::{InMemoryStore, Store};

        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let product = tx
            .create_product(common::NewProduct {
                name: "Ramen".to_string(),
                price: Money::from_yen(900),
                stock: 5,
                tag_ids: vec![],
                image: None,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = VanishingRowTx {
            inner: store.begin().await.unwrap(),
            orders_created: 0,
        };
        let order = ValidOrder {
            customer_name: None,
            comment: None,
            lines: vec![(product.id, 2)],
        };

        let result = place_order(&mut tx, order, Utc::now()).await;

        let err = match result {
            Err(DomainError::Order(err)) => err,
            other => panic!("expected an order error, got {other:?}"),
        };
        assert!(matches!(
            err,
            OrderError::InsufficientStock { product_id, requested: 2 } if product_id == product.id
        ));
        assert_eq!(err.to_string(), "注文の個数が在庫を上回っています");
        assert_eq!(tx.orders_created, 0);

        let result = crate::transaction::finish(tx, Err::<Order, _>(err.into())).await;
        assert!(result.is_err());
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.stock_of(product.id).await, Some(5));
    }
}

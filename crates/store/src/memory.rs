use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{
    NewOrder, NewProduct, Order, OrderId, OrderQuery, OrderStatus, Pagination, Product, ProductId,
    ProductTag, ProductUpdate, TagId,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::repository::{
    OrderRepository, PRODUCT_NAME_CONSTRAINT, PRODUCT_STOCK_CONSTRAINT, ProductRepository,
    TAG_NAME_CONSTRAINT, TagRepository,
};
use crate::transaction::{Store, Transaction};
use crate::{Result, StoreError};

const MAX_STOCK: i64 = 1_000_000_000;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: BTreeMap<ProductId, Product>,
    tags: BTreeMap<TagId, ProductTag>,
    orders: BTreeMap<OrderId, Order>,
    last_product_id: i64,
    last_tag_id: i64,
    last_order_id: i64,
}

/// In-memory store implementation for testing.
///
/// Transactions are fully serialized: [`Store::begin`] waits for the previous
/// transaction to finish, then works on a private copy of the data that is
/// written back only on commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    stock_writes: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stock writes issued so far, including writes made by
    /// transactions that were later rolled back.
    pub fn stock_write_count(&self) -> usize {
        self.stock_writes.load(Ordering::SeqCst)
    }

    /// Returns the committed stock of a product.
    pub async fn stock_of(&self, id: ProductId) -> Option<i64> {
        self.state
            .lock()
            .await
            .products
            .get(&id)
            .map(|product| product.stock)
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryTransaction;

    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTransaction {
            guard,
            working,
            stock_writes: self.stock_writes.clone(),
        })
    }
}

/// An open in-memory transaction holding the store lock.
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    stock_writes: Arc<AtomicUsize>,
}

impl InMemoryTransaction {
    fn check_product_name(&self, name: &str, except: Option<ProductId>) -> Result<()> {
        let taken = self
            .working
            .products
            .values()
            .any(|product| product.name == name && Some(product.id) != except);
        if taken {
            return Err(StoreError::UniqueViolation {
                constraint: PRODUCT_NAME_CONSTRAINT.to_string(),
            });
        }
        Ok(())
    }

    fn check_stock(stock: i64) -> Result<()> {
        if !(0..=MAX_STOCK).contains(&stock) {
            return Err(StoreError::CheckViolation {
                constraint: PRODUCT_STOCK_CONSTRAINT.to_string(),
            });
        }
        Ok(())
    }

    fn normalize_tags(tag_ids: Vec<TagId>) -> Vec<TagId> {
        tag_ids
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn page<T>(items: impl Iterator<Item = T>, pagination: Pagination) -> Vec<T> {
    items
        .skip(pagination.offset as usize)
        .take(pagination.limit as usize)
        .collect()
}

#[async_trait]
impl ProductRepository for InMemoryTransaction {
    async fn find_products_by_ids(
        &mut self,
        ids: &[ProductId],
        pagination: Pagination,
    ) -> Result<Vec<Product>> {
        let wanted: BTreeSet<ProductId> = ids.iter().copied().collect();
        let found = wanted
            .iter()
            .filter_map(|id| self.working.products.get(id))
            .cloned();
        Ok(page(found, pagination))
    }

    async fn lock_products(&mut self, _ids: &[ProductId]) -> Result<()> {
        // The whole store is already held by this transaction.
        Ok(())
    }

    async fn find_product_by_id(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn find_product_by_name(&mut self, name: &str) -> Result<Option<Product>> {
        Ok(self
            .working
            .products
            .values()
            .find(|product| product.name == name)
            .cloned())
    }

    async fn list_products(&mut self, pagination: Pagination) -> Result<Vec<Product>> {
        Ok(page(
            self.working.products.values().cloned(),
            pagination,
        ))
    }

    async fn count_products(&mut self) -> Result<u64> {
        Ok(self.working.products.len() as u64)
    }

    async fn create_product(&mut self, product: NewProduct) -> Result<Product> {
        self.check_product_name(&product.name, None)?;
        Self::check_stock(product.stock)?;

        self.working.last_product_id += 1;
        let now = Utc::now();
        let created = Product {
            id: ProductId::new(self.working.last_product_id),
            name: product.name,
            price: product.price,
            stock: product.stock,
            tag_ids: Self::normalize_tags(product.tag_ids),
            image: product.image,
            created_at: now,
            updated_at: now,
        };
        self.working.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_product(
        &mut self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Option<Product>> {
        if update.stock.is_some() {
            self.stock_writes.fetch_add(1, Ordering::SeqCst);
        }
        if !self.working.products.contains_key(&id) {
            return Ok(None);
        }
        if let Some(name) = &update.name {
            self.check_product_name(name, Some(id))?;
        }
        if let Some(stock) = update.stock {
            Self::check_stock(stock)?;
        }

        let Some(product) = self.working.products.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(stock) = update.stock {
            product.stock = stock;
        }
        if let Some(tag_ids) = update.tag_ids {
            product.tag_ids = Self::normalize_tags(tag_ids);
        }
        if let Some(image) = update.image {
            product.image = image;
        }
        product.updated_at = Utc::now();

        Ok(Some(product.clone()))
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<bool> {
        Ok(self.working.products.remove(&id).is_some())
    }
}

#[async_trait]
impl TagRepository for InMemoryTransaction {
    async fn find_tags_by_names(&mut self, names: &[String]) -> Result<Vec<ProductTag>> {
        Ok(self
            .working
            .tags
            .values()
            .filter(|tag| names.contains(&tag.name))
            .cloned()
            .collect())
    }

    async fn create_tag(&mut self, name: &str) -> Result<ProductTag> {
        if self.working.tags.values().any(|tag| tag.name == name) {
            return Err(StoreError::UniqueViolation {
                constraint: TAG_NAME_CONSTRAINT.to_string(),
            });
        }

        self.working.last_tag_id += 1;
        let tag = ProductTag {
            id: TagId::new(self.working.last_tag_id),
            name: name.to_string(),
        };
        self.working.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn list_tags(&mut self) -> Result<Vec<ProductTag>> {
        Ok(self.working.tags.values().cloned().collect())
    }

    async fn delete_orphan_tags(&mut self) -> Result<Vec<TagId>> {
        let referenced: BTreeSet<TagId> = self
            .working
            .products
            .values()
            .flat_map(|product| product.tag_ids.iter().copied())
            .collect();

        let orphans: Vec<TagId> = self
            .working
            .tags
            .keys()
            .filter(|id| !referenced.contains(id))
            .copied()
            .collect();
        for id in &orphans {
            self.working.tags.remove(id);
        }
        Ok(orphans)
    }
}

#[async_trait]
impl OrderRepository for InMemoryTransaction {
    async fn create_order(&mut self, order: NewOrder) -> Result<Order> {
        self.working.last_order_id += 1;
        let created = Order {
            id: OrderId::new(self.working.last_order_id),
            customer_name: order.customer_name,
            comment: order.comment,
            created_at: order.created_at,
            status: order.status,
            total_amount: order.total_amount,
            items: order.items,
        };
        self.working.orders.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_order_by_id(&mut self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn list_orders(&mut self, query: OrderQuery) -> Result<Vec<Order>> {
        let mut orders: Vec<&Order> = self
            .working
            .orders
            .values()
            .filter(|order| query.status.is_none_or(|status| order.status == status))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(page(orders.into_iter().cloned(), query.pagination))
    }

    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>> {
        Ok(self.working.orders.get_mut(&id).map(|order| {
            order.status = status;
            order.clone()
        }))
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn commit(self) -> Result<()> {
        let InMemoryTransaction {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

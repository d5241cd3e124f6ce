//! Repository traits implemented by every store transaction.

use async_trait::async_trait;
use common::{
    NewOrder, NewProduct, Order, OrderId, OrderQuery, OrderStatus, Pagination, Product,
    ProductId, ProductTag, ProductUpdate, TagId,
};

use crate::Result;

/// Unique constraint on product names.
pub const PRODUCT_NAME_CONSTRAINT: &str = "products_name_key";

/// Unique constraint on tag names.
pub const TAG_NAME_CONSTRAINT: &str = "product_tags_name_key";

/// Check constraint keeping stock within `0..=1e9`.
pub const PRODUCT_STOCK_CONSTRAINT: &str = "products_stock_check";

/// Product rows, including the per-product stock ledger.
#[async_trait]
pub trait ProductRepository: Send {
    /// Loads the products with the given ids, ascending by id.
    ///
    /// Unknown ids are left out of the result; callers must detect them.
    async fn find_products_by_ids(
        &mut self,
        ids: &[ProductId],
        pagination: Pagination,
    ) -> Result<Vec<Product>>;

    /// Locks the given product rows until the transaction ends.
    ///
    /// Rows are locked in ascending id order. Unknown ids are ignored.
    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<()>;

    async fn find_product_by_id(&mut self, id: ProductId) -> Result<Option<Product>>;

    async fn find_product_by_name(&mut self, name: &str) -> Result<Option<Product>>;

    async fn list_products(&mut self, pagination: Pagination) -> Result<Vec<Product>>;

    async fn count_products(&mut self) -> Result<u64>;

    async fn create_product(&mut self, product: NewProduct) -> Result<Product>;

    /// Applies a partial update and returns the updated product, or `None`
    /// if no product has the id.
    ///
    /// A stock value is written as given; this is not a compare-and-swap.
    async fn update_product(
        &mut self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Option<Product>>;

    /// Deletes a product and its tag relations. Returns false if it did not exist.
    async fn delete_product(&mut self, id: ProductId) -> Result<bool>;
}

/// Product tags.
#[async_trait]
pub trait TagRepository: Send {
    async fn find_tags_by_names(&mut self, names: &[String]) -> Result<Vec<ProductTag>>;

    async fn create_tag(&mut self, name: &str) -> Result<ProductTag>;

    async fn list_tags(&mut self) -> Result<Vec<ProductTag>>;

    /// Deletes every tag no product refers to and returns their ids.
    async fn delete_orphan_tags(&mut self) -> Result<Vec<TagId>>;
}

/// Orders and their items.
#[async_trait]
pub trait OrderRepository: Send {
    /// Inserts an order with its items and returns it with its generated id.
    async fn create_order(&mut self, order: NewOrder) -> Result<Order>;

    async fn find_order_by_id(&mut self, id: OrderId) -> Result<Option<Order>>;

    /// Lists orders, newest first.
    async fn list_orders(&mut self, query: OrderQuery) -> Result<Vec<Order>>;

    /// Sets the status of an order. Returns `None` if no order has the id.
    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>>;
}

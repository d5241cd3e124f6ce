use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    ImageMime, Money, NewOrder, NewProduct, Order, OrderId, OrderItem, OrderQuery, OrderStatus,
    Pagination, Product, ProductId, ProductImage, ProductTag, ProductUpdate, TagId,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row};

use crate::repository::{OrderRepository, ProductRepository, TagRepository};
use crate::transaction::{IsolationLevel, Store, Transaction};
use crate::{Result, StoreError};

const PRODUCT_SELECT: &str = r#"
    SELECT
        p.id, p.name, p.price, p.stock, p.image, p.image_mime, p.created_at, p.updated_at,
        COALESCE(
            ARRAY_AGG(r.tag_id ORDER BY r.tag_id) FILTER (WHERE r.tag_id IS NOT NULL),
            '{}'::BIGINT[]
        ) AS tag_ids
    FROM products p
    LEFT JOIN product_tag_relations r ON r.product_id = p.id
"#;

const ORDER_SELECT: &str = r#"
    SELECT id, customer_name, comment, created_at, status, total_amount
    FROM orders
"#;

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    isolation: IsolationLevel,
}

impl PostgresStore {
    /// Creates a store over an existing pool at the default isolation level.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            isolation: IsolationLevel::default(),
        }
    }

    /// Connects a new pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Sets the isolation level used by every transaction.
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PostgresTransaction;

    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> Result<PostgresTransaction> {
        let mut tx = self.pool.begin().await?;
        // Must be the first statement of the transaction.
        sqlx::query(self.isolation.set_transaction_sql())
            .execute(&mut *tx)
            .await?;
        Ok(PostgresTransaction { tx })
    }
}

/// An open PostgreSQL transaction. Rolled back on drop unless committed.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

impl PostgresTransaction {
    fn row_to_product(row: &PgRow) -> Result<Product> {
        let image_data: Option<Vec<u8>> = row.try_get("image")?;
        let image_mime: Option<String> = row.try_get("image_mime")?;
        let image = match (image_data, image_mime) {
            (Some(data), Some(mime)) => {
                let mime = ImageMime::from_mime(&mime).ok_or_else(|| StoreError::InvalidData {
                    column: "image_mime",
                    reason: format!("unsupported image type {mime}"),
                })?;
                Some(ProductImage::new(data, mime))
            }
            _ => None,
        };

        let tag_ids: Vec<i64> = row.try_get("tag_ids")?;

        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            price: Money::from_yen(row.try_get("price")?),
            stock: row.try_get("stock")?,
            tag_ids: tag_ids.into_iter().map(TagId::new).collect(),
            image,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }

    fn row_to_tag(row: &PgRow) -> Result<ProductTag> {
        Ok(ProductTag {
            id: TagId::new(row.try_get("id")?),
            name: row.try_get("name")?,
        })
    }

    fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::InvalidData {
                column: "status",
                reason: e.to_string(),
            })?;

        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            customer_name: row.try_get("customer_name")?,
            comment: row.try_get("comment")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            status,
            total_amount: Money::from_yen(row.try_get("total_amount")?),
            items,
        })
    }

    async fn replace_product_tags(&mut self, id: ProductId, tag_ids: &[TagId]) -> Result<()> {
        sqlx::query("DELETE FROM product_tag_relations WHERE product_id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await?;

        if tag_ids.is_empty() {
            return Ok(());
        }

        let raw: Vec<i64> = tag_ids.iter().map(TagId::get).collect();
        sqlx::query(
            r#"
            INSERT INTO product_tag_relations (product_id, tag_id)
            SELECT $1, UNNEST($2::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id.get())
        .bind(raw)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn load_items(&mut self, order_ids: &[i64]) -> Result<HashMap<i64, Vec<OrderItem>>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, unit_amount, quantity
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id ASC, position ASC
            "#,
        )
        .bind(order_ids.to_vec())
        .fetch_all(&mut *self.tx)
        .await?;

        let mut items: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let quantity: i32 = row.try_get("quantity")?;
            let quantity = u32::try_from(quantity).map_err(|e| StoreError::InvalidData {
                column: "quantity",
                reason: e.to_string(),
            })?;
            items
                .entry(row.try_get("order_id")?)
                .or_default()
                .push(OrderItem {
                    product_id: ProductId::new(row.try_get("product_id")?),
                    product_name: row.try_get("product_name")?,
                    unit_amount: Money::from_yen(row.try_get("unit_amount")?),
                    quantity,
                });
        }
        Ok(items)
    }

    async fn orders_with_items(&mut self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let ids = rows
            .iter()
            .map(|row| row.try_get::<i64, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut items = self.load_items(&ids).await?;

        rows.iter()
            .zip(ids)
            .map(|(row, id)| Self::row_to_order(row, items.remove(&id).unwrap_or_default()))
            .collect()
    }
}

#[async_trait]
impl ProductRepository for PostgresTransaction {
    async fn find_products_by_ids(
        &mut self,
        ids: &[ProductId],
        pagination: Pagination,
    ) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let raw: Vec<i64> = ids.iter().map(ProductId::get).collect();
        let sql = format!(
            "{PRODUCT_SELECT} WHERE p.id = ANY($1) GROUP BY p.id ORDER BY p.id ASC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(raw)
            .bind(pagination.limit_i64())
            .bind(pagination.offset_i64())
            .fetch_all(&mut *self.tx)
            .await?;

        rows.iter().map(Self::row_to_product).collect()
    }

    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let raw: Vec<i64> = ids.iter().map(ProductId::get).collect();
        let locked: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE")
                .bind(raw)
                .fetch_all(&mut *self.tx)
                .await?;

        tracing::debug!(requested = ids.len(), locked = locked.len(), "locked product rows");
        Ok(())
    }

    async fn find_product_by_id(&mut self, id: ProductId) -> Result<Option<Product>> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.id = $1 GROUP BY p.id");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn find_product_by_name(&mut self, name: &str) -> Result<Option<Product>> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.name = $1 GROUP BY p.id");
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn list_products(&mut self, pagination: Pagination) -> Result<Vec<Product>> {
        let sql = format!("{PRODUCT_SELECT} GROUP BY p.id ORDER BY p.id ASC LIMIT $1 OFFSET $2");
        let rows = sqlx::query(&sql)
            .bind(pagination.limit_i64())
            .bind(pagination.offset_i64())
            .fetch_all(&mut *self.tx)
            .await?;

        rows.iter().map(Self::row_to_product).collect()
    }

    async fn count_products(&mut self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn create_product(&mut self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, price, stock, image, image_mime)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, created_at, updated_at
            "#,
        )
        .bind(&product.name)
        .bind(product.price.yen())
        .bind(product.stock)
        .bind(product.image.as_ref().map(|image| image.data.as_slice()))
        .bind(product.image.as_ref().map(|image| image.mime.as_str()))
        .fetch_one(&mut *self.tx)
        .await?;

        let id = ProductId::new(row.try_get("id")?);
        let mut tag_ids = product.tag_ids;
        tag_ids.sort();
        tag_ids.dedup();
        self.replace_product_tags(id, &tag_ids).await?;

        Ok(Product {
            id,
            name: product.name,
            price: product.price,
            stock: product.stock,
            tag_ids,
            image: product.image,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn update_product(
        &mut self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Option<Product>> {
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                price = COALESCE($3, price),
                stock = COALESCE($4, stock),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id.get())
        .bind(update.name.as_deref())
        .bind(update.price.map(|price| price.yen()))
        .bind(update.stock)
        .fetch_optional(&mut *self.tx)
        .await?;

        if updated.is_none() {
            return Ok(None);
        }

        if let Some(image) = &update.image {
            sqlx::query("UPDATE products SET image = $2, image_mime = $3 WHERE id = $1")
                .bind(id.get())
                .bind(image.as_ref().map(|image| image.data.as_slice()))
                .bind(image.as_ref().map(|image| image.mime.as_str()))
                .execute(&mut *self.tx)
                .await?;
        }

        if let Some(tag_ids) = &update.tag_ids {
            let mut tag_ids = tag_ids.clone();
            tag_ids.sort();
            tag_ids.dedup();
            self.replace_product_tags(id, &tag_ids).await?;
        }

        self.find_product_by_id(id).await
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TagRepository for PostgresTransaction {
    async fn find_tags_by_names(&mut self, names: &[String]) -> Result<Vec<ProductTag>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query("SELECT id, name FROM product_tags WHERE name = ANY($1) ORDER BY id")
            .bind(names.to_vec())
            .fetch_all(&mut *self.tx)
            .await?;

        rows.iter().map(Self::row_to_tag).collect()
    }

    async fn create_tag(&mut self, name: &str) -> Result<ProductTag> {
        let id: i64 = sqlx::query_scalar("INSERT INTO product_tags (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(ProductTag {
            id: TagId::new(id),
            name: name.to_string(),
        })
    }

    async fn list_tags(&mut self) -> Result<Vec<ProductTag>> {
        let rows = sqlx::query("SELECT id, name FROM product_tags ORDER BY id")
            .fetch_all(&mut *self.tx)
            .await?;

        rows.iter().map(Self::row_to_tag).collect()
    }

    async fn delete_orphan_tags(&mut self) -> Result<Vec<TagId>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            DELETE FROM product_tags t
            WHERE NOT EXISTS (
                SELECT 1 FROM product_tag_relations r WHERE r.tag_id = t.id
            )
            RETURNING t.id
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(ids.into_iter().map(TagId::new).collect())
    }
}

#[async_trait]
impl OrderRepository for PostgresTransaction {
    async fn create_order(&mut self, order: NewOrder) -> Result<Order> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders (customer_name, comment, created_at, status, total_amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, created_at
            "#,
        )
        .bind(order.customer_name.as_deref())
        .bind(order.comment.as_deref())
        .bind(order.created_at)
        .bind(order.status.as_str())
        .bind(order.total_amount.yen())
        .fetch_one(&mut *self.tx)
        .await?;

        let id: i64 = row.try_get("id")?;

        for (position, item) in order.items.iter().enumerate() {
            let position = i32::try_from(position).map_err(|e| StoreError::InvalidData {
                column: "position",
                reason: e.to_string(),
            })?;
            let quantity = i32::try_from(item.quantity).map_err(|e| StoreError::InvalidData {
                column: "quantity",
                reason: e.to_string(),
            })?;

            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, product_id, product_name, unit_amount, quantity)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(id)
            .bind(position)
            .bind(item.product_id.get())
            .bind(&item.product_name)
            .bind(item.unit_amount.yen())
            .bind(quantity)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(Order {
            id: OrderId::new(id),
            customer_name: order.customer_name,
            comment: order.comment,
            created_at: row.try_get("created_at")?,
            status: order.status,
            total_amount: order.total_amount,
            items: order.items,
        })
    }

    async fn find_order_by_id(&mut self, id: OrderId) -> Result<Option<Order>> {
        let sql = format!("{ORDER_SELECT} WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await?;

        match row {
            Some(row) => Ok(self.orders_with_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_orders(&mut self, query: OrderQuery) -> Result<Vec<Order>> {
        let sql = format!(
            "{ORDER_SELECT} WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(query.status.map(|status| status.as_str()))
            .bind(query.pagination.limit_i64())
            .bind(query.pagination.offset_i64())
            .fetch_all(&mut *self.tx)
            .await?;

        self.orders_with_items(rows).await
    }

    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>> {
        let updated: Option<i64> =
            sqlx::query_scalar("UPDATE orders SET status = $2 WHERE id = $1 RETURNING id")
                .bind(id.get())
                .bind(status.as_str())
                .fetch_optional(&mut *self.tx)
                .await?;

        match updated {
            Some(_) => self.find_order_by_id(id).await,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

//! Records read from and written to the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Money, OrderId, OrderStatus, Pagination, ProductId, TagId};

/// Image formats accepted for product pictures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageMime {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/webp")]
    Webp,
    #[serde(rename = "image/gif")]
    Gif,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Png => "image/png",
            ImageMime::Webp => "image/webp",
            ImageMime::Gif => "image/gif",
        }
    }

    /// Parses a MIME type string, returning `None` for unsupported formats.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" => Some(ImageMime::Jpeg),
            "image/png" => Some(ImageMime::Png),
            "image/webp" => Some(ImageMime::Webp),
            "image/gif" => Some(ImageMime::Gif),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImageMime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A product picture.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub data: Vec<u8>,
    pub mime: ImageMime,
}

impl ProductImage {
    pub fn new(data: Vec<u8>, mime: ImageMime) -> Self {
        Self { data, mime }
    }
}

impl std::fmt::Debug for ProductImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductImage")
            .field("bytes", &self.data.len())
            .field("mime", &self.mime)
            .finish()
    }
}

/// A product on the menu, including its live stock count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: i64,
    /// Tags attached to the product, ascending by id.
    pub tag_ids: Vec<TagId>,
    pub image: Option<ProductImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub stock: i64,
    pub tag_ids: Vec<TagId>,
    pub image: Option<ProductImage>,
}

/// Partial update of a product. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<i64>,
    /// Replaces the full tag set.
    pub tag_ids: Option<Vec<TagId>>,
    /// `Some(None)` removes the image.
    pub image: Option<Option<ProductImage>>,
}

impl ProductUpdate {
    /// An update that only sets the stock count.
    pub fn stock(stock: i64) -> Self {
        Self {
            stock: Some(stock),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.tag_ids.is_none()
            && self.image.is_none()
    }
}

/// A tag that groups products.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductTag {
    pub id: TagId,
    pub name: String,
}

/// A line of an order with the product name and price captured when the
/// order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The ordered product. The product may since have been deleted.
    pub product_id: ProductId,

    /// Product name at order time.
    pub product_name: String,

    /// Unit price at order time.
    pub unit_amount: Money,

    pub quantity: u32,
}

impl OrderItem {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        unit_amount: Money,
        quantity: u32,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            unit_amount,
            quantity,
        }
    }

    /// Returns `unit_amount * quantity`, or `None` on overflow.
    pub fn subtotal(&self) -> Option<Money> {
        self.unit_amount.checked_mul(self.quantity)
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: Money,
    /// Items in the order they were requested.
    pub items: Vec<OrderItem>,
}

/// Fields for inserting an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_name: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub items: Vec<OrderItem>,
}

/// Filter for listing orders, newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub pagination: Pagination,
}

impl OrderQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime_parsing() {
        assert_eq!(ImageMime::from_mime("image/png"), Some(ImageMime::Png));
        assert_eq!(ImageMime::from_mime("image/webp"), Some(ImageMime::Webp));
        assert_eq!(ImageMime::from_mime("image/svg+xml"), None);
        assert_eq!(ImageMime::Gif.to_string(), "image/gif");
    }

    #[test]
    fn test_image_debug_hides_bytes() {
        let image = ProductImage::new(vec![0xff; 1024], ImageMime::Jpeg);
        let debug = format!("{image:?}");
        assert!(debug.contains("1024"));
        assert!(!debug.contains("255"));
    }

    #[test]
    fn test_stock_update_touches_only_stock() {
        let update = ProductUpdate::stock(3);
        assert_eq!(update.stock, Some(3));
        assert!(update.name.is_none());
        assert!(update.tag_ids.is_none());
        assert!(!update.is_empty());
        assert!(ProductUpdate::default().is_empty());
    }

    #[test]
    fn test_order_item_subtotal() {
        let item = OrderItem::new(ProductId::new(1), "Ramen", Money::from_yen(900), 3);
        assert_eq!(item.subtotal(), Some(Money::from_yen(2700)));

        let huge = OrderItem::new(ProductId::new(1), "Ramen", Money::from_yen(i64::MAX), 2);
        assert_eq!(huge.subtotal(), None);
    }

    #[test]
    fn test_order_query_builder() {
        let query = OrderQuery::new()
            .status(OrderStatus::Pending)
            .paginate(Pagination::page(2, 10));
        assert_eq!(query.status, Some(OrderStatus::Pending));
        assert_eq!(query.pagination.offset, 10);
    }
}

//! Shared value types and records for the kitchen order system.
//!
//! Everything here is plain data: identifiers, money, pagination, the order
//! status enum and the records that repositories read and write. Business
//! rules live in the `domain` crate.

pub mod model;
pub mod money;
pub mod pagination;
pub mod status;
pub mod types;

pub use model::{
    ImageMime, NewOrder, NewProduct, Order, OrderItem, OrderQuery, Product, ProductImage,
    ProductTag, ProductUpdate,
};
pub use money::Money;
pub use pagination::Pagination;
pub use status::{OrderStatus, ParseOrderStatusError};
pub use types::{OrderId, ProductId, TagId};

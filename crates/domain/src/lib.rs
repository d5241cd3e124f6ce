//! Domain layer for the kitchen order system.
//!
//! This crate provides the business operations on top of the `store` crate:
//! - [`OrderService`]: the order placement transaction (stock validation,
//!   decrement, totals, persistence) and the order status workflow
//! - [`ProductService`]: product registration, edits and deletion, including
//!   tag resolution and orphan tag reaping

pub mod error;
pub mod order;
pub mod product;
mod text;
mod transaction;

pub use error::DomainError;
pub use order::{
    MAX_COMMENT_LENGTH, MAX_QUANTITY, OrderError, OrderLine, OrderService, PRODUCT_LIMIT,
    RegisterOrder, SetOrderStatus,
};
pub use product::{
    EditProduct, ImageChange, MAX_IMAGE_BYTES, MAX_NAME_LENGTH, MAX_PRODUCTS, MAX_TAGS,
    ProductError, ProductService, RegisterProduct,
};

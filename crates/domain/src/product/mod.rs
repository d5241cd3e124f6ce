//! Product and tag commands.

mod commands;
mod service;
mod tags;

pub use commands::{
    EditProduct, ImageChange, MAX_IMAGE_BYTES, MAX_NAME_LENGTH, MAX_PRICE, MAX_STOCK, MAX_TAGS,
    RegisterProduct,
};
pub use service::{MAX_PRODUCTS, ProductService};

use common::ProductId;
use thiserror::Error;

/// Errors that can occur during product and tag operations.
#[derive(Debug, Error)]
pub enum ProductError {
    #[error("商品名は1文字以上{max}文字以内で入力してください")]
    InvalidName { length: usize, max: usize },

    #[error("価格は0以上{max}以下で入力してください")]
    InvalidPrice { price: i64, max: i64 },

    #[error("在庫数は0以上{max}以下で入力してください")]
    InvalidStock { stock: i64, max: i64 },

    #[error("タグは{max}個まで設定できます")]
    TooManyTags { count: usize, max: usize },

    #[error("タグ名は1文字以上{max}文字以内で入力してください")]
    InvalidTagName { name: String, max: usize },

    #[error("画像サイズが大きすぎます")]
    ImageTooLarge { size: usize, max: usize },

    #[error("対応していない画像形式です")]
    UnsupportedImageType { mime: String },

    #[error("同じ名前の商品が既に存在します")]
    DuplicateName { name: String },

    #[error("登録できる商品数の上限に達しています")]
    LimitReached { limit: u64 },

    #[error("商品が見つかりません")]
    NotFound { product_id: ProductId },
}

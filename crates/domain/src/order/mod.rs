//! Order placement and the order status workflow.

mod commands;
mod placement;
mod service;

pub use commands::{MAX_COMMENT_LENGTH, MAX_QUANTITY, OrderLine, RegisterOrder, SetOrderStatus};
pub use placement::PRODUCT_LIMIT;
pub use service::OrderService;

use common::{OrderId, OrderStatus, ProductId};
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The order has no items.
    #[error("注文する商品を1つ以上選択してください")]
    NoItems,

    /// A line item quantity is not a positive integer within range.
    #[error("注文の個数は1以上{max}以下で指定してください")]
    InvalidQuantity { quantity: i64, max: i64 },

    /// The comment is too long.
    #[error("コメントは{max}文字以内で入力してください")]
    CommentTooLong { length: usize, max: usize },

    /// A requested product does not exist.
    #[error("注文に存在しない商品が含まれています")]
    ProductNotFound { product_id: ProductId },

    /// A requested quantity exceeds the product's stock.
    #[error("注文の個数が在庫を上回っています")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
    },

    /// No order has the given id.
    #[error("注文が見つかりません")]
    OrderNotFound { order_id: OrderId },

    /// The order cannot move to the requested status.
    #[error("注文のステータスを{from}から{to}に変更できません")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// The order total does not fit in the amount type.
    #[error("注文の合計金額が大きすぎます")]
    AmountOverflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_messages_are_exact() {
        assert_eq!(
            OrderError::ProductNotFound {
                product_id: ProductId::new(999)
            }
            .to_string(),
            "注文に存在しない商品が含まれています"
        );
        assert_eq!(
            OrderError::InsufficientStock {
                product_id: ProductId::new(1),
                requested: 3
            }
            .to_string(),
            "注文の個数が在庫を上回っています"
        );
        assert_eq!(
            OrderError::OrderNotFound {
                order_id: OrderId::new(1)
            }
            .to_string(),
            "注文が見つかりません"
        );
    }

    #[test]
    fn transition_message_names_both_states() {
        let err = OrderError::InvalidStatusTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::Pending,
        };
        assert_eq!(
            err.to_string(),
            "注文のステータスをcompletedからpendingに変更できません"
        );
    }
}

//! Order commands and their validation.

use common::{OrderId, OrderStatus, ProductId};

use super::OrderError;
use crate::text::{grapheme_len, non_blank};

/// Largest quantity a single line may request. Matches the stock ceiling.
pub const MAX_QUANTITY: i64 = 1_000_000_000;

/// Maximum comment length in graphemes.
pub const MAX_COMMENT_LENGTH: usize = 250;

/// A requested line: a product and how many of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl OrderLine {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Command to place an order against live stock.
#[derive(Debug, Clone, Default)]
pub struct RegisterOrder {
    pub customer_name: Option<String>,
    pub comment: Option<String>,
    /// Lines are applied in this order.
    pub order_items: Vec<OrderLine>,
}

impl RegisterOrder {
    /// Creates a command without customer name or comment.
    pub fn new(order_items: Vec<OrderLine>) -> Self {
        Self {
            order_items,
            ..Self::default()
        }
    }

    pub fn customer_name(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Checks the request shape before any transaction is opened.
    pub(crate) fn validate(self) -> Result<ValidOrder, OrderError> {
        if self.order_items.is_empty() {
            return Err(OrderError::NoItems);
        }

        let lines = self
            .order_items
            .iter()
            .map(|line| {
                if !(1..=MAX_QUANTITY).contains(&line.quantity) {
                    return Err(OrderError::InvalidQuantity {
                        quantity: line.quantity,
                        max: MAX_QUANTITY,
                    });
                }
                let quantity =
                    u32::try_from(line.quantity).map_err(|_| OrderError::InvalidQuantity {
                        quantity: line.quantity,
                        max: MAX_QUANTITY,
                    })?;
                Ok((line.product_id, quantity))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let comment = non_blank(self.comment);
        if let Some(comment) = &comment {
            let length = grapheme_len(comment);
            if length > MAX_COMMENT_LENGTH {
                return Err(OrderError::CommentTooLong {
                    length,
                    max: MAX_COMMENT_LENGTH,
                });
            }
        }

        Ok(ValidOrder {
            customer_name: non_blank(self.customer_name),
            comment,
            lines,
        })
    }
}

/// A request that passed shape validation.
#[derive(Debug, Clone)]
pub(crate) struct ValidOrder {
    pub customer_name: Option<String>,
    pub comment: Option<String>,
    pub lines: Vec<(ProductId, u32)>,
}

/// Command to move an order to another status.
#[derive(Debug, Clone, Copy)]
pub struct SetOrderStatus {
    pub id: OrderId,
    pub status: OrderStatus,
}

impl SetOrderStatus {
    pub fn new(id: OrderId, status: OrderStatus) -> Self {
        Self { id, status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, quantity: i64) -> OrderLine {
        OrderLine::new(ProductId::new(id), quantity)
    }

    #[test]
    fn test_empty_order_is_rejected() {
        let err = RegisterOrder::new(vec![]).validate().unwrap_err();
        assert!(matches!(err, OrderError::NoItems));
    }

    #[test]
    fn test_non_positive_quantities_are_rejected() {
        for quantity in [0, -1, MAX_QUANTITY + 1] {
            let err = RegisterOrder::new(vec![line(1, 1), line(2, quantity)])
                .validate()
                .unwrap_err();
            assert!(
                matches!(err, OrderError::InvalidQuantity { quantity: q, .. } if q == quantity)
            );
        }
    }

    #[test]
    fn test_comment_length_counts_graphemes() {
        let ok = "あ".repeat(MAX_COMMENT_LENGTH);
        assert!(
            RegisterOrder::new(vec![line(1, 1)])
                .comment(ok)
                .validate()
                .is_ok()
        );

        let too_long = "あ".repeat(MAX_COMMENT_LENGTH + 1);
        let err = RegisterOrder::new(vec![line(1, 1)])
            .comment(too_long)
            .validate()
            .unwrap_err();
        assert!(matches!(err, OrderError::CommentTooLong { length: 251, .. }));
    }

    #[test]
    fn test_blank_optional_fields_become_none() {
        let valid = RegisterOrder::new(vec![line(1, 2)])
            .customer_name("  ")
            .comment("")
            .validate()
            .unwrap();
        assert_eq!(valid.customer_name, None);
        assert_eq!(valid.comment, None);
        assert_eq!(valid.lines, vec![(ProductId::new(1), 2)]);
    }

    #[test]
    fn test_line_order_is_preserved() {
        let valid = RegisterOrder::new(vec![line(3, 1), line(1, 2), line(3, 4)])
            .validate()
            .unwrap();
        let ids: Vec<i64> = valid.lines.iter().map(|(id, _)| id.get()).collect();
        assert_eq!(ids, vec![3, 1, 3]);
    }
}

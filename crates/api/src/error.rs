//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError, ProductError};
use store::StoreError;

/// Shown when a write lost a race with a concurrent request.
pub const CONFLICT_MESSAGE: &str = "他の操作と競合しました。もう一度お試しください";

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::Order(order_err) => match order_err {
            OrderError::ProductNotFound { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            OrderError::InsufficientStock { .. } | OrderError::InvalidStatusTransition { .. } => {
                StatusCode::CONFLICT
            }
            OrderError::OrderNotFound { .. } => StatusCode::NOT_FOUND,
            OrderError::NoItems
            | OrderError::InvalidQuantity { .. }
            | OrderError::CommentTooLong { .. }
            | OrderError::AmountOverflow => StatusCode::BAD_REQUEST,
        },
        DomainError::Product(product_err) => match product_err {
            ProductError::NotFound { .. } => StatusCode::NOT_FOUND,
            ProductError::DuplicateName { .. } | ProductError::LimitReached { .. } => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::BAD_REQUEST,
        },
        DomainError::Store(
            store_err @ (StoreError::Conflict(_) | StoreError::UniqueViolation { .. }),
        ) => {
            tracing::warn!(error = %store_err, "request lost a race with another transaction");
            return (StatusCode::CONFLICT, CONFLICT_MESSAGE.to_string());
        }
        DomainError::Store(store_err) => {
            tracing::error!(error = %store_err, "internal server error");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            );
        }
    };
    (status, err.to_string())
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<ProductError> for ApiError {
    fn from(err: ProductError) -> Self {
        ApiError::Domain(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use common::{OrderId, OrderStatus, ProductId};

    use super::*;

    fn status_of(err: impl Into<DomainError>) -> StatusCode {
        ApiError::Domain(err.into()).into_response().status()
    }

    #[test]
    fn test_order_errors_map_to_status_codes() {
        let product_id = ProductId::new(1);
        assert_eq!(
            status_of(OrderError::ProductNotFound { product_id }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(OrderError::InsufficientStock {
                product_id,
                requested: 3
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(OrderError::OrderNotFound {
                order_id: OrderId::new(1)
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(OrderError::InvalidStatusTransition {
                from: OrderStatus::Completed,
                to: OrderStatus::Pending,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(OrderError::NoItems), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_product_errors_map_to_status_codes() {
        assert_eq!(
            status_of(ProductError::DuplicateName {
                name: "Ramen".to_string()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ProductError::UnsupportedImageType {
                mime: "image/bmp".to_string()
            }),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_store_errors_hide_details() {
        let err = DomainError::Store(StoreError::InvalidData {
            column: "status",
            reason: "bad".to_string(),
        });
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status_of(StoreError::Conflict("serialization failure".to_string())),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_tag_name_race_has_user_facing_message() {
        let err = StoreError::UniqueViolation {
            constraint: store::TAG_NAME_CONSTRAINT.to_string(),
        };
        let response = ApiError::Domain(err.into()).into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], CONFLICT_MESSAGE);
        assert!(!json["error"].as_str().unwrap().contains("product_tags_name_key"));
    }
}

//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{Order, OrderId, OrderItem, OrderQuery, OrderStatus, Pagination};
use domain::{OrderLine, RegisterOrder, SetOrderStatus};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterOrderRequest {
    pub customer_name: Option<String>,
    pub comment: Option<String>,
    pub order_items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersParams {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub customer_name: Option<String>,
    pub comment: Option<String>,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub created_at: String,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: i64,
    pub product_name: String,
    pub unit_amount: i64,
    pub quantity: u32,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            product_id: item.product_id.get(),
            product_name: item.product_name,
            unit_amount: item.unit_amount.yen(),
            quantity: item.quantity,
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.get(),
            customer_name: order.customer_name,
            comment: order.comment,
            status: order.status,
            total_amount: order.total_amount.yen(),
            created_at: order.created_at.to_rfc3339(),
            items: order.items.into_iter().map(Into::into).collect(),
        }
    }
}

// -- Handlers --

/// POST /orders: place an order, decrementing stock.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<RegisterOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(req) = payload?;

    let lines = req
        .order_items
        .iter()
        .map(|item| OrderLine::new(item.product_id.into(), item.quantity))
        .collect();
    let mut cmd = RegisterOrder::new(lines);
    cmd.customer_name = req.customer_name;
    cmd.comment = req.comment;

    let order = state.orders.register_order(cmd).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .orders
        .get_order(OrderId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("注文が見つかりません".to_string()))?;

    Ok(Json(order.into()))
}

/// GET /orders: list orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let mut query = OrderQuery::new().paginate(Pagination::page(
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(Pagination::DEFAULT_PER_PAGE),
    ));
    if let Some(status) = &params.status {
        query = query.status(parse_status(status)?);
    }

    let orders = state.orders.list_orders(query).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// PUT /orders/{id}/status: move an order through the kitchen workflow.
#[tracing::instrument(skip(state, payload))]
pub async fn set_status<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    payload: Result<Json<SetStatusRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let Json(req) = payload?;
    let status = parse_status(&req.status)?;

    let order = state
        .orders
        .set_order_status(SetOrderStatus::new(OrderId::new(id), status))
        .await?;
    Ok(Json(order.into()))
}

fn parse_status(status: &str) -> Result<OrderStatus, ApiError> {
    status
        .parse()
        .map_err(|e: common::ParseOrderStatusError| ApiError::BadRequest(e.to_string()))
}

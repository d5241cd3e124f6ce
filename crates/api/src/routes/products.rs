//! Product and tag endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::{ImageMime, Product, ProductId, ProductImage, ProductTag};
use domain::{EditProduct, ImageChange, ProductError, RegisterProduct};
use serde::{Deserialize, Serialize};
use store::Store;

use super::PageParams;
use crate::AppState;
use crate::error::ApiError;

// -- Request types --

/// Image payload with base64-encoded bytes.
#[derive(Deserialize)]
pub struct ImagePayload {
    pub data: String,
    pub mime_type: String,
}

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: i64,
    pub stock: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    pub image: Option<ImagePayload>,
}

#[derive(Deserialize)]
pub struct EditProductRequest {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub image: Option<ImagePayload>,
    /// Clears the image. Ignored when `image` is given.
    #[serde(default)]
    pub remove_image: bool,
}

// -- Response types --

#[derive(Serialize)]
pub struct ImageResponse {
    pub data: String,
    pub mime_type: &'static str,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub stock: i64,
    pub tag_ids: Vec<i64>,
    pub image: Option<ImageResponse>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.get(),
            name: product.name,
            price: product.price.yen(),
            stock: product.stock,
            tag_ids: product.tag_ids.iter().map(|id| id.get()).collect(),
            image: product.image.map(|image| ImageResponse {
                data: STANDARD.encode(&image.data),
                mime_type: image.mime.as_str(),
            }),
            created_at: product.created_at.to_rfc3339(),
            updated_at: product.updated_at.to_rfc3339(),
        }
    }
}

impl From<ProductTag> for TagResponse {
    fn from(tag: ProductTag) -> Self {
        Self {
            id: tag.id.get(),
            name: tag.name,
        }
    }
}

impl ImagePayload {
    fn decode(self) -> Result<ProductImage, ApiError> {
        let mime = ImageMime::from_mime(&self.mime_type).ok_or(ProductError::UnsupportedImageType {
            mime: self.mime_type.clone(),
        })?;
        let data = STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| ApiError::BadRequest(format!("画像データを読み込めません: {e}")))?;
        Ok(ProductImage::new(data, mime))
    }
}

// -- Handlers --

/// POST /products: register a product.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let Json(req) = payload?;

    let cmd = RegisterProduct {
        name: req.name,
        price: req.price,
        stock: req.stock,
        tag_names: req.tags,
        image: req.image.map(ImagePayload::decode).transpose()?,
    };

    let product = state.products.register_product(cmd).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .products
        .get_product(ProductId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("商品が見つかりません".to_string()))?;

    Ok(Json(product.into()))
}

/// GET /products: list products in id order.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.products.list_products(params.pagination()).await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// PATCH /products/{id}: partial update.
#[tracing::instrument(skip(state, payload))]
pub async fn edit<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    payload: Result<Json<EditProductRequest>, JsonRejection>,
) -> Result<Json<ProductResponse>, ApiError> {
    let Json(req) = payload?;

    let image = match req.image {
        Some(image) => ImageChange::Replace(image.decode()?),
        None if req.remove_image => ImageChange::Remove,
        None => ImageChange::Keep,
    };
    let cmd = EditProduct {
        name: req.name,
        price: req.price,
        stock: req.stock,
        tag_names: req.tags,
        image,
    };

    let product = state.products.edit_product(ProductId::new(id), cmd).await?;
    Ok(Json(product.into()))
}

/// DELETE /products/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.products.delete_product(ProductId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /tags
#[tracing::instrument(skip(state))]
pub async fn tags<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<TagResponse>>, ApiError> {
    let tags = state.products.list_tags().await?;
    Ok(Json(tags.into_iter().map(Into::into).collect()))
}

//! Product service: registration, edits and deletion of menu items.

use common::{NewProduct, Pagination, Product, ProductId, ProductTag, ProductUpdate};
use store::{
    PRODUCT_NAME_CONSTRAINT, ProductRepository, Store, StoreError, TagRepository, Transaction,
};

use super::ProductError;
use super::commands::{EditProduct, RegisterProduct, ValidEdit, ValidProduct};
use super::tags::{reap_orphan_tags, resolve_tag_ids};
use crate::error::DomainError;
use crate::transaction::finish;

/// Maximum number of products the store may hold.
pub const MAX_PRODUCTS: u64 = 1000;

/// Service for managing products and their tags.
pub struct ProductService<S: Store> {
    store: S,
}

impl<S: Store> ProductService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a new product, creating any tags it names.
    #[tracing::instrument(skip(self, cmd), fields(name = %cmd.name))]
    pub async fn register_product(&self, cmd: RegisterProduct) -> Result<Product, DomainError> {
        let product = cmd.validate()?;

        let mut tx = self.store.begin().await?;
        let result = insert_product(&mut tx, product).await;
        let result = finish(tx, result).await;

        match &result {
            Ok(product) => {
                metrics::counter!("products_registered_total").increment(1);
                tracing::info!(product_id = %product.id, stock = product.stock, "product registered");
            }
            Err(err) => tracing::warn!(error = %err, "product registration rejected"),
        }
        result
    }

    /// Applies a partial edit to a product.
    ///
    /// Replacing the tag set deletes tags that end up unused.
    #[tracing::instrument(skip(self, cmd))]
    pub async fn edit_product(
        &self,
        id: ProductId,
        cmd: EditProduct,
    ) -> Result<Product, DomainError> {
        let edit = cmd.validate()?;

        let mut tx = self.store.begin().await?;
        let result = apply_edit(&mut tx, id, edit).await;
        let result = finish(tx, result).await;

        if let Ok(product) = &result {
            tracing::info!(product_id = %product.id, "product edited");
        }
        result
    }

    /// Deletes a product and any tags only it used.
    ///
    /// Order history keeps its own copy of name and price, so past orders
    /// are unaffected.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;
        let result = remove_product(&mut tx, id).await;
        let result = finish(tx, result).await;

        if result.is_ok() {
            metrics::counter!("products_deleted_total").increment(1);
            tracing::info!(product_id = %id, "product deleted");
        }
        result
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = tx.find_product_by_id(id).await.map_err(DomainError::from);
        finish(tx, result).await
    }

    /// Lists products in ascending id order.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self, pagination: Pagination) -> Result<Vec<Product>, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = tx
            .list_products(pagination)
            .await
            .map_err(DomainError::from);
        finish(tx, result).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_tags(&self) -> Result<Vec<ProductTag>, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_tags().await.map_err(DomainError::from);
        finish(tx, result).await
    }
}

async fn insert_product<T: Transaction>(
    tx: &mut T,
    product: ValidProduct,
) -> Result<Product, DomainError> {
    let count = tx.count_products().await?;
    if count >= MAX_PRODUCTS {
        return Err(ProductError::LimitReached {
            limit: MAX_PRODUCTS,
        }
        .into());
    }
    if tx.find_product_by_name(&product.name).await?.is_some() {
        return Err(ProductError::DuplicateName { name: product.name }.into());
    }

    let tag_ids = resolve_tag_ids(tx, &product.tag_names).await?;
    let name = product.name.clone();
    tx.create_product(NewProduct {
        name: product.name,
        price: product.price,
        stock: product.stock,
        tag_ids,
        image: product.image,
    })
    .await
    .map_err(|err| duplicate_name(err, name))
}

async fn apply_edit<T: Transaction>(
    tx: &mut T,
    id: ProductId,
    edit: ValidEdit,
) -> Result<Product, DomainError> {
    let not_found = || ProductError::NotFound { product_id: id };

    let current = tx.find_product_by_id(id).await?.ok_or_else(not_found)?;

    if let Some(name) = edit.name.as_ref().filter(|name| **name != current.name) {
        if tx.find_product_by_name(name).await?.is_some() {
            return Err(ProductError::DuplicateName { name: name.clone() }.into());
        }
    }

    let tag_ids = match &edit.tag_names {
        Some(names) => Some(resolve_tag_ids(tx, names).await?),
        None => None,
    };
    let retags = tag_ids.is_some();

    let update = ProductUpdate {
        name: edit.name.clone(),
        price: edit.price,
        stock: edit.stock,
        tag_ids,
        image: edit.image,
    };
    if update.is_empty() {
        return Ok(current);
    }

    let updated = tx
        .update_product(id, update)
        .await
        .map_err(|err| duplicate_name(err, edit.name.unwrap_or_default()))?
        .ok_or_else(not_found)?;

    if retags {
        reap_orphan_tags(tx).await?;
    }
    Ok(updated)
}

async fn remove_product<T: Transaction>(tx: &mut T, id: ProductId) -> Result<(), DomainError> {
    if !tx.delete_product(id).await? {
        return Err(ProductError::NotFound { product_id: id }.into());
    }
    reap_orphan_tags(tx).await?;
    Ok(())
}

/// Maps a lost race on the product name constraint to the business error.
fn duplicate_name(err: StoreError, name: String) -> DomainError {
    if err.is_unique_violation(PRODUCT_NAME_CONSTRAINT) {
        ProductError::DuplicateName { name }.into()
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use common::Money;
    use store::InMemoryStore;

    use super::*;
    use crate::product::ImageChange;

    fn ramen() -> RegisterProduct {
        RegisterProduct {
            name: "Ramen".to_string(),
            price: 900,
            stock: 10,
            tag_names: vec!["noodles".to_string(), "hot".to_string()],
            image: None,
        }
    }

    #[tokio::test]
    async fn test_register_product_creates_tags() {
        let service = ProductService::new(InMemoryStore::new());

        let product = service.register_product(ramen()).await.unwrap();

        assert_eq!(product.name, "Ramen");
        assert_eq!(product.price, Money::from_yen(900));
        assert_eq!(product.tag_ids.len(), 2);
        let tags = service.list_tags().await.unwrap();
        let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["noodles", "hot"]);
    }

    #[tokio::test]
    async fn test_existing_tags_are_reused() {
        let service = ProductService::new(InMemoryStore::new());
        let first = service.register_product(ramen()).await.unwrap();

        let mut udon = ramen();
        udon.name = "Udon".to_string();
        let second = service.register_product(udon).await.unwrap();

        assert_eq!(first.tag_ids, second.tag_ids);
        assert_eq!(service.list_tags().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected() {
        let service = ProductService::new(InMemoryStore::new());
        service.register_product(ramen()).await.unwrap();

        let err = service.register_product(ramen()).await.unwrap_err();

        assert!(matches!(
            err,
            DomainError::Product(ProductError::DuplicateName { .. })
        ));
        assert_eq!(err.to_string(), "同じ名前の商品が既に存在します");
    }

    #[tokio::test]
    async fn test_edit_product_partial_fields() {
        let service = ProductService::new(InMemoryStore::new());
        let product = service.register_product(ramen()).await.unwrap();

        let edited = service
            .edit_product(
                product.id,
                EditProduct {
                    price: Some(1000),
                    stock: Some(3),
                    ..EditProduct::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(edited.name, "Ramen");
        assert_eq!(edited.price, Money::from_yen(1000));
        assert_eq!(edited.stock, 3);
        assert_eq!(edited.tag_ids, product.tag_ids);
    }

    #[tokio::test]
    async fn test_edit_to_taken_name_is_rejected() {
        let service = ProductService::new(InMemoryStore::new());
        service.register_product(ramen()).await.unwrap();
        let mut udon = ramen();
        udon.name = "Udon".to_string();
        let udon = service.register_product(udon).await.unwrap();

        let err = service
            .edit_product(
                udon.id,
                EditProduct {
                    name: Some("Ramen".to_string()),
                    ..EditProduct::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::Product(ProductError::DuplicateName { .. })
        ));
    }

    #[tokio::test]
    async fn test_retagging_reaps_unused_tags() {
        let service = ProductService::new(InMemoryStore::new());
        let product = service.register_product(ramen()).await.unwrap();

        service
            .edit_product(
                product.id,
                EditProduct {
                    tag_names: Some(vec!["noodles".to_string()]),
                    image: ImageChange::Keep,
                    ..EditProduct::default()
                },
            )
            .await
            .unwrap();

        let tags = service.list_tags().await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "noodles");
    }

    #[tokio::test]
    async fn test_delete_product() {
        let service = ProductService::new(InMemoryStore::new());
        let product = service.register_product(ramen()).await.unwrap();

        service.delete_product(product.id).await.unwrap();

        assert!(service.get_product(product.id).await.unwrap().is_none());
        assert!(service.list_tags().await.unwrap().is_empty());

        let err = service.delete_product(product.id).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Product(ProductError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_edit_unknown_product() {
        let service = ProductService::new(InMemoryStore::new());

        let err = service
            .edit_product(ProductId::new(42), EditProduct::default())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "商品が見つかりません");
    }

    #[tokio::test]
    async fn test_list_products_is_paginated() {
        let service = ProductService::new(InMemoryStore::new());
        for name in ["A", "B", "C"] {
            let mut cmd = ramen();
            cmd.name = name.to_string();
            cmd.tag_names.clear();
            service.register_product(cmd).await.unwrap();
        }

        let page = service
            .list_products(Pagination::new(2, 1))
            .await
            .unwrap();
        let names: Vec<_> = page.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }
}

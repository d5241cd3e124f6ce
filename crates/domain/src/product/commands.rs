//! Product commands and their validation.

use common::{Money, ProductImage};

use super::ProductError;
use crate::text::grapheme_len;

/// Maximum product and tag name length in graphemes.
pub const MAX_NAME_LENGTH: usize = 50;

pub const MAX_PRICE: i64 = 1_000_000_000;

pub const MAX_STOCK: i64 = 1_000_000_000;

/// Maximum number of tags on one product.
pub const MAX_TAGS: usize = 20;

/// Maximum raw image size. Base64 encoding grows this to 10 MiB.
pub const MAX_IMAGE_BYTES: usize = 7_864_320;

/// Command to register a new product.
#[derive(Debug, Clone, Default)]
pub struct RegisterProduct {
    pub name: String,
    pub price: i64,
    pub stock: i64,
    /// Tag names; unknown names are created.
    pub tag_names: Vec<String>,
    pub image: Option<ProductImage>,
}

/// What to do with a product's image on edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageChange {
    #[default]
    Keep,
    Replace(ProductImage),
    Remove,
}

/// Command to edit a product. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct EditProduct {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i64>,
    /// Replaces the product's tags when present.
    pub tag_names: Option<Vec<String>>,
    pub image: ImageChange,
}

#[derive(Debug, Clone)]
pub(crate) struct ValidProduct {
    pub name: String,
    pub price: Money,
    pub stock: i64,
    pub tag_names: Vec<String>,
    pub image: Option<ProductImage>,
}

#[derive(Debug, Clone)]
pub(crate) struct ValidEdit {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<i64>,
    pub tag_names: Option<Vec<String>>,
    pub image: Option<Option<ProductImage>>,
}

impl RegisterProduct {
    pub(crate) fn validate(self) -> Result<ValidProduct, ProductError> {
        if let Some(image) = &self.image {
            validate_image(image)?;
        }
        Ok(ValidProduct {
            name: validate_name(&self.name)?,
            price: validate_price(self.price)?,
            stock: validate_stock(self.stock)?,
            tag_names: validate_tag_names(self.tag_names)?,
            image: self.image,
        })
    }
}

impl EditProduct {
    pub(crate) fn validate(self) -> Result<ValidEdit, ProductError> {
        let image = match self.image {
            ImageChange::Keep => None,
            ImageChange::Remove => Some(None),
            ImageChange::Replace(image) => {
                validate_image(&image)?;
                Some(Some(image))
            }
        };

        Ok(ValidEdit {
            name: self.name.as_deref().map(validate_name).transpose()?,
            price: self.price.map(validate_price).transpose()?,
            stock: self.stock.map(validate_stock).transpose()?,
            tag_names: self.tag_names.map(validate_tag_names).transpose()?,
            image,
        })
    }
}

fn validate_name(name: &str) -> Result<String, ProductError> {
    let name = name.trim();
    let length = grapheme_len(name);
    if length == 0 || length > MAX_NAME_LENGTH {
        return Err(ProductError::InvalidName {
            length,
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(name.to_string())
}

fn validate_price(price: i64) -> Result<Money, ProductError> {
    if !(0..=MAX_PRICE).contains(&price) {
        return Err(ProductError::InvalidPrice {
            price,
            max: MAX_PRICE,
        });
    }
    Ok(Money::from_yen(price))
}

fn validate_stock(stock: i64) -> Result<i64, ProductError> {
    if !(0..=MAX_STOCK).contains(&stock) {
        return Err(ProductError::InvalidStock {
            stock,
            max: MAX_STOCK,
        });
    }
    Ok(stock)
}

/// Trims and de-duplicates tag names, keeping first-seen order.
fn validate_tag_names(names: Vec<String>) -> Result<Vec<String>, ProductError> {
    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        let length = grapheme_len(name);
        if length == 0 || length > MAX_NAME_LENGTH {
            return Err(ProductError::InvalidTagName {
                name: name.to_string(),
                max: MAX_NAME_LENGTH,
            });
        }
        if !unique.iter().any(|existing| existing == name) {
            unique.push(name.to_string());
        }
    }

    if unique.len() > MAX_TAGS {
        return Err(ProductError::TooManyTags {
            count: unique.len(),
            max: MAX_TAGS,
        });
    }
    Ok(unique)
}

fn validate_image(image: &ProductImage) -> Result<(), ProductError> {
    if image.data.len() > MAX_IMAGE_BYTES {
        return Err(ProductError::ImageTooLarge {
            size: image.data.len(),
            max: MAX_IMAGE_BYTES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use common::ImageMime;

    use super::*;

    fn register(name: &str) -> RegisterProduct {
        RegisterProduct {
            name: name.to_string(),
            price: 900,
            stock: 10,
            ..RegisterProduct::default()
        }
    }

    #[test]
    fn test_name_is_trimmed_and_bounded() {
        assert_eq!(register("  醤油ラーメン ").validate().unwrap().name, "醤油ラーメン");
        assert!(matches!(
            register("   ").validate(),
            Err(ProductError::InvalidName { length: 0, .. })
        ));
        assert!(register(&"麺".repeat(MAX_NAME_LENGTH)).validate().is_ok());
        assert!(matches!(
            register(&"麺".repeat(MAX_NAME_LENGTH + 1)).validate(),
            Err(ProductError::InvalidName { length: 51, .. })
        ));
    }

    #[test]
    fn test_price_and_stock_bounds() {
        let mut cmd = register("Ramen");
        cmd.price = -1;
        assert!(matches!(
            cmd.validate(),
            Err(ProductError::InvalidPrice { .. })
        ));

        let mut cmd = register("Ramen");
        cmd.stock = MAX_STOCK + 1;
        assert!(matches!(
            cmd.validate(),
            Err(ProductError::InvalidStock { .. })
        ));

        let mut cmd = register("Ramen");
        cmd.price = MAX_PRICE;
        cmd.stock = 0;
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn test_tag_names_are_deduplicated() {
        let mut cmd = register("Ramen");
        cmd.tag_names = vec![
            "noodles".to_string(),
            " spicy ".to_string(),
            "noodles".to_string(),
        ];
        assert_eq!(cmd.validate().unwrap().tag_names, vec!["noodles", "spicy"]);
    }

    #[test]
    fn test_too_many_tags() {
        let mut cmd = register("Ramen");
        cmd.tag_names = (0..=MAX_TAGS).map(|i| format!("tag-{i}")).collect();
        assert!(matches!(
            cmd.validate(),
            Err(ProductError::TooManyTags { count: 21, .. })
        ));
    }

    #[test]
    fn test_blank_tag_name_is_rejected() {
        let mut cmd = register("Ramen");
        cmd.tag_names = vec!["".to_string()];
        assert!(matches!(
            cmd.validate(),
            Err(ProductError::InvalidTagName { .. })
        ));
    }

    #[test]
    fn test_image_size_limit() {
        let mut cmd = register("Ramen");
        cmd.image = Some(ProductImage::new(vec![0; MAX_IMAGE_BYTES + 1], ImageMime::Png));
        assert!(matches!(
            cmd.validate(),
            Err(ProductError::ImageTooLarge { .. })
        ));
    }

    #[test]
    fn test_edit_maps_image_change() {
        let edit = EditProduct {
            image: ImageChange::Remove,
            ..EditProduct::default()
        }
        .validate()
        .unwrap();
        assert_eq!(edit.image, Some(None));

        let edit = EditProduct::default().validate().unwrap();
        assert_eq!(edit.image, None);
        assert!(edit.name.is_none());
    }

    #[test]
    fn test_edit_validates_present_fields() {
        let err = EditProduct {
            price: Some(-5),
            ..EditProduct::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, ProductError::InvalidPrice { price: -5, .. }));
    }
}

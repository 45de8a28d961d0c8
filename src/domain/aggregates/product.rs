//! Catalog aggregate: categories, products, variants and images

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::{Money, Percent};

/// Per-line purchase limit, further capped by stock.
pub const MAX_QTY_PER_ITEM: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category_id: Option<Uuid>,
    pub brand: String,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub color: String,
    pub size: String,
    pub price: Money,
    pub stock: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub url: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

/// Price after the product's best live offer.
pub fn discounted_price(price: Money, best_offer: Percent) -> Money {
    if best_offer.is_zero() {
        return price;
    }
    price.scale(best_offer.remaining_factor())
}

/// How many units of a variant one cart line may hold.
pub fn purchase_cap(stock: i32) -> u32 {
    let stock = u32::try_from(stock).unwrap_or(0);
    stock.min(MAX_QTY_PER_ITEM)
}

impl ProductVariant {
    pub fn in_stock(&self) -> bool { self.stock > 0 }
    pub fn purchase_cap(&self) -> u32 { purchase_cap(self.stock) }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProductError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("Price cannot be negative")]
    NegativePrice,
    #[error("Stock cannot be negative")]
    NegativeStock,
    #[error("A category cannot be its own parent")]
    SelfParent,
    #[error("Parent must be a top-level category")]
    NestedParent,
}

fn required(value: &str, field: &'static str) -> Result<(), ProductError> {
    if value.trim().is_empty() { Err(ProductError::Required(field)) } else { Ok(()) }
}

pub fn validate_product(name: &str, brand: &str, description: &str, category_id: Option<Uuid>) -> Result<(), ProductError> {
    required(name, "Name")?;
    required(brand, "Brand")?;
    required(description, "Description")?;
    category_id.map(|_| ()).ok_or(ProductError::Required("Category"))
}

pub fn validate_variant(color: &str, size: &str, price: Decimal, stock: i32) -> Result<(), ProductError> {
    required(color, "Color")?;
    required(size, "Size")?;
    if price < Decimal::ZERO { return Err(ProductError::NegativePrice); }
    if stock < 0 { return Err(ProductError::NegativeStock); }
    Ok(())
}

/// Categories nest one level deep. `parent` is the looked-up parent row.
pub fn validate_category_parent(category_id: Option<Uuid>, parent: &Category) -> Result<(), ProductError> {
    if Some(parent.id) == category_id { return Err(ProductError::SelfParent); }
    if parent.parent_id.is_some() { return Err(ProductError::NestedParent); }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(parent_id: Option<Uuid>) -> Category {
        Category { id: Uuid::now_v7(), name: "Helmets".into(), description: String::new(), parent_id, created_at: Utc::now() }
    }

    #[test]
    fn test_discounted_price() {
        let price = Money::new(Decimal::new(99999, 2));
        assert_eq!(discounted_price(price, Percent::zero()), price);
        let ten = Percent::new(Decimal::new(10, 0)).unwrap();
        assert_eq!(discounted_price(price, ten).amount(), Decimal::new(89999, 2));
    }

    #[test]
    fn test_purchase_cap() {
        assert_eq!(purchase_cap(0), 0);
        assert_eq!(purchase_cap(3), 3);
        assert_eq!(purchase_cap(40), MAX_QTY_PER_ITEM);
        assert_eq!(purchase_cap(-2), 0);
    }

    #[test]
    fn test_variant_validation() {
        assert_eq!(validate_variant(" ", "M", Decimal::ONE, 1), Err(ProductError::Required("Color")));
        assert_eq!(validate_variant("Red", "M", Decimal::NEGATIVE_ONE, 1), Err(ProductError::NegativePrice));
        assert_eq!(validate_variant("Red", "M", Decimal::ONE, -1), Err(ProductError::NegativeStock));
        assert!(validate_variant("Red", "M", Decimal::ZERO, 0).is_ok());
    }

    #[test]
    fn test_product_validation() {
        assert_eq!(validate_product("Gloves", "", "Warm", Some(Uuid::now_v7())), Err(ProductError::Required("Brand")));
        assert_eq!(validate_product("Gloves", "Acme", "Warm", None), Err(ProductError::Required("Category")));
    }

    #[test]
    fn test_category_parent_one_level() {
        let top = category(None);
        assert!(validate_category_parent(None, &top).is_ok());
        assert_eq!(validate_category_parent(Some(top.id), &top), Err(ProductError::SelfParent));
        assert_eq!(validate_category_parent(None, &category(Some(top.id))), Err(ProductError::NestedParent));
    }
}

//! Cart Aggregate

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::product::{discounted_price, purchase_cap};
use crate::domain::value_objects::{Money, Percent};

pub const OFFER_COUPON_NOTICE: &str = "Coupons cannot be applied when products already have offers.";

/// One cart row joined with its variant and product.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct CartLine {
    pub item_id: Uuid,
    pub variant_id: Uuid,
    pub product_id: Uuid,
    pub category_id: Option<Uuid>,
    pub product_name: String,
    pub brand: String,
    pub image_url: Option<String>,
    pub color: String,
    pub size: String,
    /// Variant list price before offers.
    pub price: Money,
    pub stock: i32,
    pub quantity: i32,
    pub product_active: bool,
    #[sqlx(skip)]
    pub best_offer: Percent,
}

impl CartLine {
    pub fn quantity(&self) -> u32 { u32::try_from(self.quantity).unwrap_or(0) }
    pub fn unit_price(&self) -> Money { discounted_price(self.price, self.best_offer) }
    pub fn line_total(&self) -> Money { self.unit_price().multiply(self.quantity()) }
    pub fn has_offer(&self) -> bool { !self.best_offer.is_zero() }
}

/// Rows the cart view had to change, to be written back.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CartAdjustments {
    pub removed: Vec<Uuid>,
    pub clamped: Vec<(Uuid, u32)>,
}

impl CartAdjustments {
    pub fn is_empty(&self) -> bool { self.removed.is_empty() && self.clamped.is_empty() }
}

#[derive(Clone, Debug)]
pub struct Cart {
    user_id: Uuid,
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(user_id: Uuid, lines: Vec<CartLine>) -> Self { Self { user_id, lines } }

    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn into_lines(self) -> Vec<CartLine> { self.lines }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn item_count(&self) -> usize { self.lines.len() }

    /// Drops sold-out lines and clamps the rest to their purchase cap.
    pub fn reconcile(&mut self) -> CartAdjustments {
        let mut adjustments = CartAdjustments::default();
        self.lines.retain(|line| {
            if line.stock <= 0 {
                adjustments.removed.push(line.item_id);
                false
            } else {
                true
            }
        });
        for line in &mut self.lines {
            let cap = purchase_cap(line.stock);
            if line.quantity() > cap {
                line.quantity = i32::try_from(cap).unwrap_or(i32::MAX);
                adjustments.clamped.push((line.item_id, cap));
            }
        }
        adjustments
    }

    pub fn has_offer(&self) -> bool { self.lines.iter().any(CartLine::has_offer) }
    pub fn subtotal(&self) -> Money { self.lines.iter().map(CartLine::line_total).sum() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityChange { Increase, Decrease }

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Product is out of stock")]
    OutOfStock,
    #[error("Product is not available")]
    Unavailable,
    #[error("Maximum quantity reached for this item")]
    MaxQuantity,
    #[error("Cart is empty")]
    Empty,
}

/// Quantity after adding one unit of a variant already holding `current`.
pub fn quantity_after_add(current: Option<u32>, stock: i32, product_active: bool) -> Result<u32, CartError> {
    if !product_active { return Err(CartError::Unavailable); }
    if stock <= 0 { return Err(CartError::OutOfStock); }
    match current {
        None => Ok(1),
        Some(qty) if qty < purchase_cap(stock) => Ok(qty + 1),
        Some(_) => Err(CartError::MaxQuantity),
    }
}

/// `None` means the line should be removed.
pub fn quantity_after_change(current: u32, stock: i32, change: QuantityChange) -> Result<Option<u32>, CartError> {
    match change {
        QuantityChange::Increase if current < purchase_cap(stock) => Ok(Some(current + 1)),
        QuantityChange::Increase => Err(CartError::MaxQuantity),
        QuantityChange::Decrease if current > 1 => Ok(Some(current - 1)),
        QuantityChange::Decrease => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn line(price: i64, qty: i32, stock: i32, offer: i64) -> CartLine {
        CartLine {
            item_id: Uuid::now_v7(), variant_id: Uuid::now_v7(), product_id: Uuid::now_v7(), category_id: None,
            product_name: "Trail Shoe".into(), brand: "Acme".into(), image_url: None,
            color: "Black".into(), size: "42".into(), price: Money::from_major(price), stock, quantity: qty,
            product_active: true, best_offer: Percent::new(Decimal::new(offer, 0)).unwrap(),
        }
    }

    #[test]
    fn test_add_respects_cap_and_stock() {
        assert_eq!(quantity_after_add(None, 3, true), Ok(1));
        assert_eq!(quantity_after_add(Some(2), 3, true), Ok(3));
        assert_eq!(quantity_after_add(Some(3), 3, true), Err(CartError::MaxQuantity));
        assert_eq!(quantity_after_add(Some(5), 50, true), Err(CartError::MaxQuantity));
        assert_eq!(quantity_after_add(None, 0, true), Err(CartError::OutOfStock));
        assert_eq!(quantity_after_add(None, 9, false), Err(CartError::Unavailable));
    }

    #[test]
    fn test_change_quantity() {
        assert_eq!(quantity_after_change(4, 10, QuantityChange::Increase), Ok(Some(5)));
        assert_eq!(quantity_after_change(5, 10, QuantityChange::Increase), Err(CartError::MaxQuantity));
        assert_eq!(quantity_after_change(2, 10, QuantityChange::Decrease), Ok(Some(1)));
        assert_eq!(quantity_after_change(1, 10, QuantityChange::Decrease), Ok(None));
    }

    #[test]
    fn test_reconcile_removes_and_clamps() {
        let sold_out = line(100, 1, 0, 0);
        let over = line(100, 4, 2, 0);
        let fine = line(100, 2, 9, 0);
        let (sold_out_id, over_id) = (sold_out.item_id, over.item_id);
        let mut cart = Cart::new(Uuid::now_v7(), vec![sold_out, over, fine]);
        let adjustments = cart.reconcile();
        assert_eq!(adjustments.removed, vec![sold_out_id]);
        assert_eq!(adjustments.clamped, vec![(over_id, 2)]);
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.subtotal(), Money::from_major(400));
    }

    #[test]
    fn test_offer_lines_use_discounted_price() {
        let cart = Cart::new(Uuid::now_v7(), vec![line(1000, 2, 9, 20), line(300, 1, 9, 0)]);
        assert!(cart.has_offer());
        assert_eq!(cart.subtotal(), Money::from_major(1900));
    }
}

//! Coupon aggregate: validity, eligibility and discount rules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::{round2, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "coupon_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    Percentage,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub kind: CouponKind,
    pub discount: Decimal,
    pub min_purchase: Money,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CouponError {
    #[error("Please enter a coupon code")]
    EmptyCode,
    #[error("Invalid coupon code")]
    NotFound,
    #[error("This coupon has expired or is not yet valid")]
    OutsideWindow,
    #[error("This coupon has reached its usage limit")]
    UsageLimitReached,
    #[error("Minimum purchase of {0} required for this coupon")]
    MinimumNotMet(Money),
    #[error("You have already used this coupon")]
    AlreadyUsed,
    #[error("Coupons cannot be applied when products already have offers.")]
    CartHasOffers,
    #[error("Your cart is empty")]
    EmptyCart,
    #[error("{0}")]
    Invalid(&'static str),
}

impl Coupon {
    pub fn in_window(&self, now: DateTime<Utc>) -> bool { self.valid_from <= now && now <= self.valid_to }

    pub fn has_uses_left(&self) -> bool { self.usage_limit.map_or(true, |limit| self.used_count < limit) }

    pub fn check_valid(&self, now: DateTime<Utc>) -> Result<(), CouponError> {
        if !self.active { return Err(CouponError::NotFound); }
        if !self.in_window(now) { return Err(CouponError::OutsideWindow); }
        if !self.has_uses_left() { return Err(CouponError::UsageLimitReached); }
        Ok(())
    }

    /// `already_redeemed` is whether the user holds a non-refunded redemption.
    pub fn check_eligible(&self, now: DateTime<Utc>, subtotal: Money, already_redeemed: bool) -> Result<(), CouponError> {
        self.check_valid(now)?;
        if subtotal < self.min_purchase { return Err(CouponError::MinimumNotMet(self.min_purchase)); }
        if already_redeemed { return Err(CouponError::AlreadyUsed); }
        Ok(())
    }

    /// Discount on `subtotal`, never more than the subtotal itself.
    pub fn discount_for(&self, subtotal: Money) -> Money {
        let raw = match self.kind {
            CouponKind::Percentage => round2(subtotal.amount() * self.discount / Decimal::ONE_HUNDRED),
            CouponKind::Fixed => round2(self.discount),
        };
        Money::new(raw.min(subtotal.amount()).max(Decimal::ZERO))
    }
}

/// Normalises a user-entered code for lookup.
pub fn normalize_code(code: &str) -> Result<String, CouponError> {
    let trimmed = code.trim();
    if trimmed.is_empty() { return Err(CouponError::EmptyCode); }
    Ok(trimmed.to_string())
}

/// An admin-submitted coupon, before persistence.
#[derive(Debug, Clone, Deserialize)]
pub struct CouponDraft {
    pub code: String,
    pub kind: CouponKind,
    pub discount: Decimal,
    pub min_purchase: Decimal,
    pub usage_limit: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool { true }

/// A draft that passed validation; window bounds are guaranteed present.
#[derive(Debug, Clone)]
pub struct ValidCoupon {
    pub code: String,
    pub kind: CouponKind,
    pub discount: Decimal,
    pub min_purchase: Money,
    pub usage_limit: Option<i32>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub active: bool,
}

impl CouponDraft {
    pub fn validate(self) -> Result<ValidCoupon, CouponError> {
        let code = self.code.trim().to_string();
        if code.is_empty() { return Err(CouponError::Invalid("Coupon code is required")); }
        if self.min_purchase < Decimal::ONE_HUNDRED {
            return Err(CouponError::Invalid("Minimum purchase must be at least 100"));
        }
        match self.kind {
            CouponKind::Percentage => {
                if self.discount < Decimal::TEN || self.discount > Decimal::from(90) {
                    return Err(CouponError::Invalid("Percentage discount must be between 10 and 90"));
                }
            }
            CouponKind::Fixed => {
                if self.discount <= Decimal::ZERO {
                    return Err(CouponError::Invalid("Discount amount must be greater than zero"));
                }
                if self.discount >= self.min_purchase {
                    return Err(CouponError::Invalid("Discount amount must be less than the minimum purchase"));
                }
            }
        }
        let (Some(valid_from), Some(valid_to)) = (self.valid_from, self.valid_to) else {
            return Err(CouponError::Invalid("Valid from and valid to dates are required"));
        };
        if valid_from >= valid_to {
            return Err(CouponError::Invalid("Valid from must be before valid to"));
        }
        if matches!(self.usage_limit, Some(limit) if limit < 1) {
            return Err(CouponError::Invalid("Usage limit must be at least 1"));
        }
        Ok(ValidCoupon {
            code,
            kind: self.kind,
            discount: round2(self.discount),
            min_purchase: Money::new(self.min_purchase),
            usage_limit: self.usage_limit,
            valid_from,
            valid_to,
            active: self.active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(kind: CouponKind, discount: i64, min_purchase: i64) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: Uuid::now_v7(), code: "RIDE20".into(), kind, discount: Decimal::new(discount, 0),
            min_purchase: Money::from_major(min_purchase), usage_limit: Some(2), used_count: 0,
            valid_from: now - Duration::days(1), valid_to: now + Duration::days(1), active: true, created_at: now,
        }
    }

    fn draft(kind: CouponKind, discount: i64, min_purchase: i64) -> CouponDraft {
        let now = Utc::now();
        CouponDraft {
            code: " ride20 ".into(), kind, discount: Decimal::new(discount, 0), min_purchase: Decimal::new(min_purchase, 0),
            usage_limit: None, valid_from: Some(now), valid_to: Some(now + Duration::days(7)), active: true,
        }
    }

    #[test]
    fn test_discount_kinds_are_capped() {
        let pct = coupon(CouponKind::Percentage, 20, 100);
        assert_eq!(pct.discount_for(Money::new(Decimal::new(123455, 2))).amount(), Decimal::new(24691, 2));
        let fixed = coupon(CouponKind::Fixed, 500, 100);
        assert_eq!(fixed.discount_for(Money::from_major(2000)), Money::from_major(500));
        assert_eq!(fixed.discount_for(Money::from_major(300)), Money::from_major(300));
    }

    #[test]
    fn test_eligibility_errors() {
        let now = Utc::now();
        let mut c = coupon(CouponKind::Percentage, 20, 1000);
        assert_eq!(c.check_eligible(now, Money::from_major(999), false), Err(CouponError::MinimumNotMet(Money::from_major(1000))));
        assert_eq!(c.check_eligible(now, Money::from_major(1000), true), Err(CouponError::AlreadyUsed));
        assert!(c.check_eligible(now, Money::from_major(1000), false).is_ok());
        c.used_count = 2;
        assert_eq!(c.check_valid(now), Err(CouponError::UsageLimitReached));
        c.used_count = 0;
        assert_eq!(c.check_valid(now + Duration::days(2)), Err(CouponError::OutsideWindow));
        c.active = false;
        assert_eq!(c.check_valid(now), Err(CouponError::NotFound));
    }

    #[test]
    fn test_last_use_blocks_the_next_checkout() {
        let now = Utc::now();
        let mut c = coupon(CouponKind::Fixed, 100, 500);
        c.usage_limit = Some(1);
        assert!(c.check_eligible(now, Money::from_major(800), false).is_ok());
        c.used_count = 1;
        assert_eq!(c.check_eligible(now, Money::from_major(800), false), Err(CouponError::UsageLimitReached));
        c.usage_limit = None;
        assert_eq!(c.check_eligible(now, Money::from_major(800), true), Err(CouponError::AlreadyUsed));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("   "), Err(CouponError::EmptyCode));
        assert_eq!(normalize_code(" Ride20 ").unwrap(), "Ride20");
    }

    #[test]
    fn test_draft_validation() {
        assert!(draft(CouponKind::Percentage, 9, 500).validate().is_err());
        assert!(draft(CouponKind::Percentage, 91, 500).validate().is_err());
        assert!(draft(CouponKind::Fixed, 500, 500).validate().is_err());
        assert!(draft(CouponKind::Fixed, 100, 99).validate().is_err());
        let mut no_window = draft(CouponKind::Fixed, 100, 500);
        no_window.valid_to = None;
        assert!(no_window.validate().is_err());
        let mut zero_limit = draft(CouponKind::Fixed, 100, 500);
        zero_limit.usage_limit = Some(0);
        assert!(zero_limit.validate().is_err());
        let ok = draft(CouponKind::Percentage, 25, 500).validate().unwrap();
        assert_eq!(ok.code, "ride20");
    }
}

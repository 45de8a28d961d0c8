//! Offers: time-bounded percentage discounts on a product or a category

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::Percent;

pub const MAX_OFFER_PERCENT: i64 = 90;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductOffer {
    pub id: Uuid,
    pub product_id: Uuid,
    pub discount_percent: Percent,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryOffer {
    pub id: Uuid,
    pub category_id: Uuid,
    pub discount_percent: Percent,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// The part of an offer that decides whether and how much it discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferWindow {
    pub discount_percent: Percent,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
}

impl OfferWindow {
    /// Both bounds are inclusive; a missing bound is open.
    pub fn is_live(&self, today: NaiveDate) -> bool {
        self.active
            && self.start_date.map_or(true, |start| start <= today)
            && self.end_date.map_or(true, |end| today <= end)
    }
}

impl From<&ProductOffer> for OfferWindow {
    fn from(o: &ProductOffer) -> Self {
        Self { discount_percent: o.discount_percent, start_date: o.start_date, end_date: o.end_date, active: o.active }
    }
}

impl From<&CategoryOffer> for OfferWindow {
    fn from(o: &CategoryOffer) -> Self {
        Self { discount_percent: o.discount_percent, start_date: o.start_date, end_date: o.end_date, active: o.active }
    }
}

/// Highest live discount among the given offers, or zero.
pub fn best_offer<I>(offers: I, today: NaiveDate) -> Percent
where
    I: IntoIterator<Item = OfferWindow>,
{
    offers
        .into_iter()
        .filter(|o| o.is_live(today))
        .map(|o| o.discount_percent)
        .max()
        .unwrap_or_else(Percent::zero)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OfferError {
    #[error("Discount must be between 1 and {MAX_OFFER_PERCENT} percent")]
    DiscountOutOfRange,
    #[error("End date must not be before start date")]
    EndBeforeStart,
}

/// Checks an admin-submitted offer and returns its discount as a `Percent`.
pub fn validate_offer(
    discount_percent: Decimal,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<Percent, OfferError> {
    if discount_percent < Decimal::ONE || discount_percent > Decimal::from(MAX_OFFER_PERCENT) {
        return Err(OfferError::DiscountOutOfRange);
    }
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end < start {
            return Err(OfferError::EndBeforeStart);
        }
    }
    Percent::new(discount_percent).map_err(|_| OfferError::DiscountOutOfRange)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2025, 3, d).unwrap() }
    fn pct(v: i64) -> Percent { Percent::new(Decimal::new(v, 0)).unwrap() }
    fn window(v: i64, start: Option<u32>, end: Option<u32>, active: bool) -> OfferWindow {
        OfferWindow { discount_percent: pct(v), start_date: start.map(day), end_date: end.map(day), active }
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let w = window(10, Some(5), Some(10), true);
        assert!(!w.is_live(day(4)));
        assert!(w.is_live(day(5)));
        assert!(w.is_live(day(10)));
        assert!(!w.is_live(day(11)));
        assert!(window(10, None, None, true).is_live(day(1)));
        assert!(!window(10, None, None, false).is_live(day(1)));
    }

    #[test]
    fn test_best_offer_picks_highest_live() {
        let offers = vec![
            window(15, Some(1), Some(31), true),
            window(40, Some(20), None, true),
            window(30, None, None, true),
            window(80, None, None, false),
        ];
        assert_eq!(best_offer(offers.clone(), day(10)), pct(30));
        assert_eq!(best_offer(offers, day(25)), pct(40));
        assert_eq!(best_offer(Vec::new(), day(1)), Percent::zero());
    }

    #[test]
    fn test_validate_offer() {
        assert_eq!(validate_offer(Decimal::ZERO, None, None), Err(OfferError::DiscountOutOfRange));
        assert_eq!(validate_offer(Decimal::new(91, 0), None, None), Err(OfferError::DiscountOutOfRange));
        assert_eq!(validate_offer(Decimal::new(20, 0), Some(day(10)), Some(day(9))), Err(OfferError::EndBeforeStart));
        assert_eq!(validate_offer(Decimal::new(20, 0), Some(day(10)), Some(day(10))), Ok(pct(20)));
    }
}

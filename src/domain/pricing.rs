//! Checkout pricing: line totals, tax, delivery and coupon discount split.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::value_objects::Money;

#[derive(Debug, Clone, Copy)]
pub struct PricingPolicy {
    pub tax_rate: Decimal,
    pub delivery_charge: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricedLine {
    pub unit_price: Money,
    pub quantity: u32,
    pub line_subtotal: Money,
    pub tax: Money,
    pub discount: Money,
}

impl PricedLine {
    pub fn payable(&self) -> Money { self.line_subtotal + self.tax - self.discount }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderPricing {
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
    pub tax: Money,
    pub delivery_charge: Money,
    pub discount: Money,
    pub grand_total: Money,
}

impl PricingPolicy {
    /// Prices `(unit_price, quantity)` lines, spreading `discount` over them.
    pub fn price(&self, lines: &[(Money, u32)], discount: Money) -> OrderPricing {
        let mut priced: Vec<PricedLine> = lines
            .iter()
            .map(|&(unit_price, quantity)| {
                let line_subtotal = unit_price.multiply(quantity);
                PricedLine { unit_price, quantity, line_subtotal, tax: line_subtotal.scale(self.tax_rate), discount: Money::zero() }
            })
            .collect();
        let subtotal: Money = priced.iter().map(|l| l.line_subtotal).sum();
        let tax: Money = priced.iter().map(|l| l.tax).sum();
        let discount = if discount > subtotal { subtotal } else { discount };
        for (line, share) in priced.iter_mut().zip(split_discount(discount, lines.len())) {
            line.discount = share;
        }
        let delivery_charge = if lines.is_empty() { Money::zero() } else { self.delivery_charge };
        OrderPricing { grand_total: subtotal + tax + delivery_charge - discount, lines: priced, subtotal, tax, delivery_charge, discount }
    }
}

/// Splits in whole paise; the first `paise % n` lines carry one extra paisa.
pub fn split_discount(discount: Money, n: usize) -> Vec<Money> {
    if n == 0 {
        return Vec::new();
    }
    let paise = discount.to_paise().max(0);
    let n_i64 = i64::try_from(n).unwrap_or(i64::MAX);
    let per = paise / n_i64;
    let extra = paise % n_i64;
    (0..n_i64).map(|i| Money::from_paise(per + i64::from(i < extra))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> PricingPolicy {
        PricingPolicy { tax_rate: Decimal::new(18, 2), delivery_charge: Money::from_major(50) }
    }

    #[test]
    fn test_split_gives_remainder_to_first_lines() {
        let shares = split_discount(Money::from_paise(1001), 3);
        assert_eq!(shares, vec![Money::from_paise(334), Money::from_paise(334), Money::from_paise(333)]);
        assert!(split_discount(Money::from_major(10), 0).is_empty());
    }

    #[test]
    fn test_price_order() {
        let lines = [(Money::new(Decimal::new(49999, 2)), 2), (Money::from_major(250), 1)];
        let p = policy().price(&lines, Money::from_major(100));
        assert_eq!(p.subtotal.amount(), Decimal::new(124998, 2));
        assert_eq!(p.lines[0].tax.amount(), Decimal::new(18000, 2));
        assert_eq!(p.lines[1].tax.amount(), Decimal::new(4500, 2));
        assert_eq!(p.tax.amount(), Decimal::new(22500, 2));
        assert_eq!(p.lines[0].discount, Money::from_major(50));
        assert_eq!(p.grand_total.amount(), Decimal::new(142498, 2));
        let payable: Money = p.lines.iter().map(PricedLine::payable).sum();
        assert_eq!(payable + p.delivery_charge, p.grand_total);
    }

    #[test]
    fn test_discount_capped_at_subtotal() {
        let p = policy().price(&[(Money::from_major(100), 1)], Money::from_major(500));
        assert_eq!(p.discount, Money::from_major(100));
        assert_eq!(p.grand_total, Money::from_major(68));
    }
}

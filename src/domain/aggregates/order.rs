//! Order Aggregate
//!
//! An order holds many items. Fulfilment status lives on each item; the
//! order itself only tracks payment. Refunds always go to the wallet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::DomainEvent;
use crate::domain::value_objects::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cod,
    Wallet,
    Razorpay,
}

impl PaymentMethod {
    pub fn is_prepaid(&self) -> bool { !matches!(self, Self::Cod) }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cod => "Cash on Delivery",
            Self::Wallet => "Wallet",
            Self::Razorpay => "Razorpay",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    PartiallyRefunded,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_item_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderItemStatus {
    Pending,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderItemStatus {
    /// Position on the main line; `None` for the side branches.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Processing => Some(1),
            Self::Shipped => Some(2),
            Self::OutForDelivery => Some(3),
            Self::Delivered => Some(4),
            Self::Cancelled | Self::Returned => None,
        }
    }

    pub fn is_terminal(&self) -> bool { matches!(self, Self::Cancelled | Self::Returned) }
    pub fn is_live(&self) -> bool { !self.is_terminal() }
    pub fn is_cancellable(&self) -> bool { matches!(self.rank(), Some(r) if r < 4) }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::OutForDelivery => "Out For Delivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Returned => "Returned",
        }
    }
}

/// Address as it was when the order was placed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_code: String,
    pub user_id: Uuid,
    pub shipping_address: Json<ShippingAddress>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub subtotal: Money,
    pub tax: Money,
    pub delivery_charge: Money,
    pub discount: Money,
    pub grand_total: Money,
    pub coupon_id: Option<Uuid>,
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    #[serde(skip_serializing)]
    pub razorpay_signature: Option<String>,
    pub delivery_refunded: bool,
    /// Cash for a COD order has been recorded as collected.
    #[serde(skip_serializing)]
    pub cod_settled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub color: String,
    pub size: String,
    pub quantity: i32,
    pub unit_price: Money,
    pub tax: Money,
    pub discount: Money,
    pub status: OrderItemStatus,
    pub cancellation_requested: bool,
    pub cancellation_reason: Option<String>,
    pub cancellation_approved: Option<bool>,
    pub return_requested: bool,
    pub return_reason: Option<String>,
    pub return_approved: Option<bool>,
    pub refund_amount: Money,
    pub delivered_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn quantity(&self) -> u32 { u32::try_from(self.quantity).unwrap_or(0) }
    pub fn line_subtotal(&self) -> Money { self.unit_price.multiply(self.quantity()) }
    /// What the customer paid for this line.
    pub fn payable(&self) -> Money { self.line_subtotal() + self.tax - self.discount }
    pub fn was_delivered(&self) -> bool { self.delivered_at.is_some() }
    pub fn cancellation_pending(&self) -> bool { self.cancellation_requested && self.cancellation_approved.is_none() }
    pub fn return_pending(&self) -> bool { self.return_requested && self.return_approved.is_none() }
}

/// Status shown for the order as a whole.
pub fn derived_status(items: &[OrderItem]) -> OrderItemStatus {
    if items.is_empty() || items.iter().all(|i| i.status == OrderItemStatus::Cancelled) {
        return OrderItemStatus::Cancelled;
    }
    if items.iter().all(|i| i.status.is_terminal()) {
        return OrderItemStatus::Returned;
    }
    items
        .iter()
        .filter(|i| i.status.is_live())
        .min_by_key(|i| i.status.rank())
        .map(|i| i.status)
        .unwrap_or(OrderItemStatus::Cancelled)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Refund {
    pub item_id: Uuid,
    pub item_amount: Money,
    pub delivery_amount: Money,
    /// No live items remain, so the coupon redemption is released.
    pub order_closed: bool,
}

impl Refund {
    pub fn total(&self) -> Money { self.item_amount + self.delivery_amount }
}

/// Side effects the caller must persist after an approval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub restock: Option<(Uuid, u32)>,
    pub refund: Option<Refund>,
    /// COD cash collected, when this decision settles the order.
    pub collected: Option<Money>,
    /// Every item is cancelled or returned; the coupon may be used again.
    pub release_coupon: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision { Approve, Reject }

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("Order item not found")]
    ItemNotFound,
    #[error("Cannot move item from {} to {}", .0.label(), .1.label())]
    InvalidTransition(OrderItemStatus, OrderItemStatus),
    #[error("{} cannot be set directly", .0.label())]
    ManualTerminal(OrderItemStatus),
    #[error("Item is already {}", .0.label())]
    Terminal(OrderItemStatus),
    #[error("Please provide a reason")]
    ReasonRequired,
    #[error("Item can no longer be cancelled")]
    NotCancellable,
    #[error("Only delivered items can be returned")]
    NotReturnable,
    #[error("A request has already been submitted for this item")]
    AlreadyRequested,
    #[error("No pending request for this item")]
    NoPendingRequest,
    #[error("Payment is not awaiting completion")]
    PaymentNotOpen,
    #[error("Order does not use online payment")]
    NotOnlinePayment,
}

/// Loaded order with its items; raises events as it changes.
#[derive(Debug, Clone)]
pub struct OrderAggregate {
    order: Order,
    items: Vec<OrderItem>,
    events: Vec<DomainEvent>,
}

impl OrderAggregate {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self { Self { order, items, events: Vec::new() } }

    pub fn order(&self) -> &Order { &self.order }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn into_parts(self) -> (Order, Vec<OrderItem>) { (self.order, self.items) }
    pub fn status(&self) -> OrderItemStatus { derived_status(&self.items) }

    pub fn item(&self, item_id: Uuid) -> Result<&OrderItem, OrderError> {
        self.items.iter().find(|i| i.id == item_id).ok_or(OrderError::ItemNotFound)
    }

    fn item_index(&self, item_id: Uuid) -> Result<usize, OrderError> {
        self.items.iter().position(|i| i.id == item_id).ok_or(OrderError::ItemNotFound)
    }

    /// Admin move along the main line. Returns the collected COD amount when
    /// this delivery settles the order.
    pub fn advance_item(&mut self, item_id: Uuid, to: OrderItemStatus, now: DateTime<Utc>) -> Result<Option<Money>, OrderError> {
        let idx = self.item_index(item_id)?;
        let from = self.items[idx].status;
        if to.is_terminal() { return Err(OrderError::ManualTerminal(to)); }
        if from.is_terminal() { return Err(OrderError::Terminal(from)); }
        if from == to { return Ok(None); }
        if to.rank() < from.rank() { return Err(OrderError::InvalidTransition(from, to)); }

        let item = &mut self.items[idx];
        item.status = to;
        item.updated_at = now;
        if to == OrderItemStatus::Delivered {
            item.delivered_at = Some(now);
        }
        self.raise(DomainEvent::ItemStatusChanged { order_id: self.order.id, item_id, from, to });

        if to == OrderItemStatus::Delivered {
            return Ok(self.settle_cod(now));
        }
        Ok(None)
    }

    /// Records COD collection once every item that was not cancelled has
    /// been delivered. Returned items count, they were paid on delivery.
    fn settle_cod(&mut self, now: DateTime<Utc>) -> Option<Money> {
        if self.order.payment_method != PaymentMethod::Cod || self.order.cod_settled {
            return None;
        }
        let mut kept = self.items.iter().filter(|i| i.status != OrderItemStatus::Cancelled).peekable();
        if kept.peek().is_none() || !kept.all(OrderItem::was_delivered) {
            return None;
        }
        let collected: Money = self.items.iter().filter(|i| i.was_delivered()).map(OrderItem::payable).sum::<Money>()
            + self.order.delivery_charge;
        self.order.cod_settled = true;
        if self.order.payment_status == PaymentStatus::Pending {
            self.order.payment_status = PaymentStatus::Paid;
        }
        self.order.updated_at = now;
        self.raise(DomainEvent::OrderPaid {
            order_id: self.order.id,
            order_code: self.order.order_code.clone(),
            amount: collected,
            payment_method: PaymentMethod::Cod,
        });
        Some(collected)
    }

    pub fn request_cancellation(&mut self, item_id: Uuid, reason: &str, now: DateTime<Utc>) -> Result<(), OrderError> {
        let reason = reason.trim();
        let idx = self.item_index(item_id)?;
        let item = &mut self.items[idx];
        if !item.status.is_cancellable() { return Err(OrderError::NotCancellable); }
        if reason.is_empty() { return Err(OrderError::ReasonRequired); }
        if item.cancellation_requested { return Err(OrderError::AlreadyRequested); }
        item.cancellation_requested = true;
        item.cancellation_reason = Some(reason.to_string());
        item.updated_at = now;
        Ok(())
    }

    pub fn decide_cancellation(&mut self, item_id: Uuid, decision: Decision, now: DateTime<Utc>) -> Result<Resolution, OrderError> {
        let idx = self.item_index(item_id)?;
        let item = &mut self.items[idx];
        if !item.cancellation_pending() { return Err(OrderError::NoPendingRequest); }
        if decision == Decision::Reject {
            item.cancellation_approved = Some(false);
            item.updated_at = now;
            return Ok(Resolution::default());
        }
        if !item.status.is_cancellable() { return Err(OrderError::NotCancellable); }
        item.cancellation_approved = Some(true);
        item.status = OrderItemStatus::Cancelled;
        item.updated_at = now;
        self.raise(DomainEvent::ItemCancelled { order_id: self.order.id, item_id });
        Ok(self.resolve(idx, now))
    }

    pub fn request_return(&mut self, item_id: Uuid, reason: &str, now: DateTime<Utc>) -> Result<(), OrderError> {
        let reason = reason.trim();
        let idx = self.item_index(item_id)?;
        let item = &mut self.items[idx];
        if item.status != OrderItemStatus::Delivered { return Err(OrderError::NotReturnable); }
        if reason.is_empty() { return Err(OrderError::ReasonRequired); }
        if item.return_requested { return Err(OrderError::AlreadyRequested); }
        item.return_requested = true;
        item.return_reason = Some(reason.to_string());
        item.updated_at = now;
        Ok(())
    }

    pub fn decide_return(&mut self, item_id: Uuid, decision: Decision, now: DateTime<Utc>) -> Result<Resolution, OrderError> {
        let idx = self.item_index(item_id)?;
        let item = &mut self.items[idx];
        if !item.return_pending() { return Err(OrderError::NoPendingRequest); }
        if decision == Decision::Reject {
            item.return_approved = Some(false);
            item.updated_at = now;
            return Ok(Resolution::default());
        }
        if item.status != OrderItemStatus::Delivered { return Err(OrderError::NotReturnable); }
        item.return_approved = Some(true);
        item.status = OrderItemStatus::Returned;
        item.updated_at = now;
        self.raise(DomainEvent::ItemReturned { order_id: self.order.id, item_id });
        Ok(self.resolve(idx, now))
    }

    /// Side effects of the item at `idx` leaving the live set.
    fn resolve(&mut self, idx: usize, now: DateTime<Utc>) -> Resolution {
        let item = &self.items[idx];
        let restock = item.variant_id.map(|v| (v, item.quantity()));
        let refund = self.refund_item(idx, now);
        let collected = self.settle_cod(now);
        let release_coupon = self.order.coupon_id.is_some() && self.items.iter().all(|i| i.status.is_terminal());
        Resolution { restock, refund, collected, release_coupon }
    }

    /// Whether money for this item has been received.
    fn item_paid(&self, item: &OrderItem) -> bool {
        if self.order.payment_method.is_prepaid() {
            matches!(self.order.payment_status, PaymentStatus::Paid | PaymentStatus::PartiallyRefunded)
        } else {
            item.was_delivered()
        }
    }

    fn delivery_collected(&self) -> bool {
        if self.order.payment_method.is_prepaid() {
            matches!(self.order.payment_status, PaymentStatus::Paid | PaymentStatus::PartiallyRefunded)
        } else {
            self.items.iter().any(OrderItem::was_delivered)
        }
    }

    /// Called after the item at `idx` has left the live set. The delivery
    /// charge goes back with the last live item even when that item itself
    /// was never paid for.
    fn refund_item(&mut self, idx: usize, now: DateTime<Utc>) -> Option<Refund> {
        let item = &self.items[idx];
        let item_amount = if self.item_paid(item) && !item.refund_amount.is_positive() { item.payable() } else { Money::zero() };
        let order_closed = self.items.iter().all(|i| i.status.is_terminal());
        let delivery_amount = if order_closed && !self.order.delivery_refunded && self.delivery_collected() {
            self.order.delivery_charge
        } else {
            Money::zero()
        };
        let refund = Refund { item_id: item.id, item_amount, delivery_amount, order_closed };
        if !refund.total().is_positive() {
            return None;
        }

        self.items[idx].refund_amount += refund.total();
        if delivery_amount.is_positive() {
            self.order.delivery_refunded = true;
        }
        self.order.payment_status = if order_closed { PaymentStatus::Refunded } else { PaymentStatus::PartiallyRefunded };
        self.order.updated_at = now;
        self.raise(DomainEvent::RefundIssued { order_id: self.order.id, item_id: refund.item_id, amount: refund.total() });
        Some(refund)
    }

    /// Razorpay may be (re)started while the payment is pending or failed.
    pub fn ensure_payment_open(&self) -> Result<(), OrderError> {
        if self.order.payment_method != PaymentMethod::Razorpay { return Err(OrderError::NotOnlinePayment); }
        match self.order.payment_status {
            PaymentStatus::Pending | PaymentStatus::Failed => Ok(()),
            _ => Err(OrderError::PaymentNotOpen),
        }
    }

    pub fn mark_paid(&mut self, now: DateTime<Utc>) {
        self.order.payment_status = PaymentStatus::Paid;
        self.order.updated_at = now;
        self.raise(DomainEvent::OrderPaid {
            order_id: self.order.id,
            order_code: self.order.order_code.clone(),
            amount: self.order.grand_total,
            payment_method: self.order.payment_method,
        });
    }

    pub fn record_gateway_payment(&mut self, payment_id: &str, signature: &str) {
        self.order.razorpay_payment_id = Some(payment_id.to_string());
        self.order.razorpay_signature = Some(signature.to_string());
    }

    pub fn mark_payment_failed(&mut self, now: DateTime<Utc>) {
        self.order.payment_status = PaymentStatus::Failed;
        self.order.updated_at = now;
        self.raise(DomainEvent::PaymentFailed { order_id: self.order.id, order_code: self.order.order_code.clone() });
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn order(method: PaymentMethod, status: PaymentStatus) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::now_v7(), order_code: "ORD-0000000042".into(), user_id: Uuid::now_v7(),
            shipping_address: Json(ShippingAddress::default()), payment_method: method, payment_status: status,
            subtotal: Money::from_major(2000), tax: Money::from_major(360), delivery_charge: Money::from_major(50),
            discount: Money::from_major(200), grand_total: Money::from_major(2210), coupon_id: None,
            razorpay_order_id: None, razorpay_payment_id: None, razorpay_signature: None, delivery_refunded: false, cod_settled: false,
            created_at: now, updated_at: now,
        }
    }

    fn item(order_id: Uuid, status: OrderItemStatus) -> OrderItem {
        OrderItem {
            id: Uuid::now_v7(), order_id, variant_id: Some(Uuid::now_v7()), product_id: Some(Uuid::now_v7()),
            product_name: "Rain Jacket".into(), color: "Blue".into(), size: "L".into(), quantity: 2,
            unit_price: Money::from_major(500), tax: Money::from_major(180), discount: Money::from_major(100), status,
            cancellation_requested: false, cancellation_reason: None, cancellation_approved: None,
            return_requested: false, return_reason: None, return_approved: None, refund_amount: Money::zero(),
            delivered_at: None, updated_at: Utc::now(),
        }
    }

    fn aggregate(method: PaymentMethod, status: PaymentStatus, n: usize) -> OrderAggregate {
        let o = order(method, status);
        let items = (0..n).map(|_| item(o.id, OrderItemStatus::Pending)).collect();
        OrderAggregate::new(o, items)
    }

    #[test]
    fn test_payable() {
        let i = item(Uuid::now_v7(), OrderItemStatus::Pending);
        assert_eq!(i.payable().amount(), Decimal::new(1080, 0));
    }

    #[test]
    fn test_forward_only_transitions() {
        let mut agg = aggregate(PaymentMethod::Wallet, PaymentStatus::Paid, 1);
        let id = agg.items()[0].id;
        let now = Utc::now();
        assert_eq!(agg.advance_item(id, OrderItemStatus::Shipped, now), Ok(None));
        assert_eq!(
            agg.advance_item(id, OrderItemStatus::Processing, now),
            Err(OrderError::InvalidTransition(OrderItemStatus::Shipped, OrderItemStatus::Processing))
        );
        assert_eq!(agg.advance_item(id, OrderItemStatus::Shipped, now), Ok(None));
        assert_eq!(
            agg.advance_item(id, OrderItemStatus::Cancelled, now),
            Err(OrderError::ManualTerminal(OrderItemStatus::Cancelled))
        );
        agg.advance_item(id, OrderItemStatus::Delivered, now).unwrap();
        assert!(agg.items()[0].delivered_at.is_some());
        assert_eq!(agg.take_events().len(), 2);
    }

    #[test]
    fn test_cod_settles_when_all_remaining_delivered() {
        let mut agg = aggregate(PaymentMethod::Cod, PaymentStatus::Pending, 2);
        let (a, b) = (agg.items()[0].id, agg.items()[1].id);
        let now = Utc::now();
        agg.request_cancellation(b, "changed my mind", now).unwrap();
        let resolution = agg.decide_cancellation(b, Decision::Approve, now).unwrap();
        assert!(resolution.refund.is_none());
        assert!(resolution.restock.is_some());
        let collected = agg.advance_item(a, OrderItemStatus::Delivered, now).unwrap();
        assert_eq!(collected, Some(Money::from_major(1130)));
        assert_eq!(agg.order().payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_cancellation_request_rules() {
        let mut agg = aggregate(PaymentMethod::Wallet, PaymentStatus::Paid, 1);
        let id = agg.items()[0].id;
        let now = Utc::now();
        assert_eq!(agg.request_cancellation(id, "   ", now), Err(OrderError::ReasonRequired));
        agg.request_cancellation(id, "late", now).unwrap();
        assert_eq!(agg.request_cancellation(id, "again", now), Err(OrderError::AlreadyRequested));
        agg.decide_cancellation(id, Decision::Reject, now).unwrap();
        assert_eq!(agg.items()[0].cancellation_approved, Some(false));
        assert_eq!(agg.decide_cancellation(id, Decision::Approve, now), Err(OrderError::NoPendingRequest));
    }

    #[test]
    fn test_prepaid_partial_then_full_refund() {
        let mut agg = aggregate(PaymentMethod::Razorpay, PaymentStatus::Paid, 2);
        let (a, b) = (agg.items()[0].id, agg.items()[1].id);
        let now = Utc::now();
        agg.request_cancellation(a, "duplicate", now).unwrap();
        let first = agg.decide_cancellation(a, Decision::Approve, now).unwrap().refund.unwrap();
        assert_eq!(first.total(), Money::from_major(1080));
        assert!(!first.order_closed);
        assert_eq!(agg.order().payment_status, PaymentStatus::PartiallyRefunded);

        agg.request_cancellation(b, "duplicate", now).unwrap();
        let second = agg.decide_cancellation(b, Decision::Approve, now).unwrap().refund.unwrap();
        assert_eq!(second.delivery_amount, Money::from_major(50));
        assert_eq!(second.total(), Money::from_major(1130));
        assert!(second.order_closed);
        assert_eq!(agg.order().payment_status, PaymentStatus::Refunded);
        assert!(agg.order().delivery_refunded);
        assert_eq!(agg.status(), OrderItemStatus::Cancelled);
    }

    #[test]
    fn test_unpaid_online_order_cancels_without_refund() {
        let mut agg = aggregate(PaymentMethod::Razorpay, PaymentStatus::Failed, 1);
        let id = agg.items()[0].id;
        let now = Utc::now();
        agg.request_cancellation(id, "payment failed", now).unwrap();
        let resolution = agg.decide_cancellation(id, Decision::Approve, now).unwrap();
        assert!(resolution.refund.is_none());
        assert_eq!(agg.order().payment_status, PaymentStatus::Failed);
    }

    #[test]
    fn test_cod_return_refunds_payable_and_delivery() {
        let mut agg = aggregate(PaymentMethod::Cod, PaymentStatus::Pending, 1);
        let id = agg.items()[0].id;
        let now = Utc::now();
        assert_eq!(agg.request_return(id, "too big", now), Err(OrderError::NotReturnable));
        agg.advance_item(id, OrderItemStatus::Delivered, now).unwrap();
        agg.request_return(id, "too big", now).unwrap();
        let refund = agg.decide_return(id, Decision::Approve, now).unwrap().refund.unwrap();
        assert_eq!(refund.total(), Money::from_major(1130));
        assert_eq!(agg.status(), OrderItemStatus::Returned);
        assert_eq!(agg.order().payment_status, PaymentStatus::Refunded);
    }

    #[test]
    fn test_cod_settles_when_last_undelivered_item_is_cancelled() {
        let mut agg = aggregate(PaymentMethod::Cod, PaymentStatus::Pending, 2);
        let (a, b) = (agg.items()[0].id, agg.items()[1].id);
        let now = Utc::now();
        assert_eq!(agg.advance_item(a, OrderItemStatus::Delivered, now), Ok(None));
        agg.request_cancellation(b, "ordered twice", now).unwrap();
        let resolution = agg.decide_cancellation(b, Decision::Approve, now).unwrap();
        assert!(resolution.refund.is_none());
        assert_eq!(resolution.collected, Some(Money::from_major(1130)));
        assert_eq!(agg.order().payment_status, PaymentStatus::Paid);
        assert!(agg.order().cod_settled);
    }

    #[test]
    fn test_cod_settles_after_an_earlier_return() {
        let mut agg = aggregate(PaymentMethod::Cod, PaymentStatus::Pending, 2);
        let (a, b) = (agg.items()[0].id, agg.items()[1].id);
        let now = Utc::now();
        agg.advance_item(a, OrderItemStatus::Delivered, now).unwrap();
        agg.request_return(a, "wrong size", now).unwrap();
        let resolution = agg.decide_return(a, Decision::Approve, now).unwrap();
        assert_eq!(resolution.refund.map(|r| r.total()), Some(Money::from_major(1080)));
        assert_eq!(resolution.collected, None);
        assert_eq!(agg.order().payment_status, PaymentStatus::PartiallyRefunded);

        let collected = agg.advance_item(b, OrderItemStatus::Delivered, now).unwrap();
        assert_eq!(collected, Some(Money::from_major(2210)));
        assert_eq!(agg.order().payment_status, PaymentStatus::PartiallyRefunded);
        assert!(agg.order().cod_settled);
        assert_eq!(agg.advance_item(b, OrderItemStatus::Delivered, now), Ok(None));
    }

    #[test]
    fn test_cod_delivery_refunded_when_last_live_item_is_cancelled() {
        let mut agg = aggregate(PaymentMethod::Cod, PaymentStatus::Pending, 2);
        let (a, b) = (agg.items()[0].id, agg.items()[1].id);
        let now = Utc::now();
        agg.advance_item(a, OrderItemStatus::Delivered, now).unwrap();
        agg.request_return(a, "damaged", now).unwrap();
        agg.decide_return(a, Decision::Approve, now).unwrap();
        agg.request_cancellation(b, "no longer needed", now).unwrap();
        let resolution = agg.decide_cancellation(b, Decision::Approve, now).unwrap();
        let refund = resolution.refund.unwrap();
        assert_eq!(refund.item_amount, Money::zero());
        assert_eq!(refund.delivery_amount, Money::from_major(50));
        assert_eq!(resolution.collected, Some(Money::from_major(1130)));
        assert_eq!(agg.order().payment_status, PaymentStatus::Refunded);
    }

    #[test]
    fn test_coupon_released_only_when_no_live_items_remain() {
        let mut o = order(PaymentMethod::Wallet, PaymentStatus::Paid);
        o.coupon_id = Some(Uuid::now_v7());
        let items = vec![item(o.id, OrderItemStatus::Pending), item(o.id, OrderItemStatus::Pending)];
        let mut agg = OrderAggregate::new(o, items);
        let (a, b) = (agg.items()[0].id, agg.items()[1].id);
        let now = Utc::now();
        agg.request_cancellation(a, "too slow", now).unwrap();
        assert!(!agg.decide_cancellation(a, Decision::Approve, now).unwrap().release_coupon);
        agg.request_cancellation(b, "too slow", now).unwrap();
        assert!(!agg.decide_cancellation(b, Decision::Reject, now).unwrap().release_coupon);
        agg.advance_item(b, OrderItemStatus::Delivered, now).unwrap();
        agg.request_return(b, "not as pictured", now).unwrap();
        assert!(agg.decide_return(b, Decision::Approve, now).unwrap().release_coupon);
    }

    #[test]
    fn test_approved_requests_restock_the_variant() {
        let mut agg = aggregate(PaymentMethod::Wallet, PaymentStatus::Paid, 2);
        let (a, b) = (agg.items()[0].clone(), agg.items()[1].clone());
        let now = Utc::now();
        agg.request_cancellation(a.id, "duplicate", now).unwrap();
        let cancelled = agg.decide_cancellation(a.id, Decision::Approve, now).unwrap();
        assert_eq!(cancelled.restock, Some((a.variant_id.unwrap(), 2)));

        agg.advance_item(b.id, OrderItemStatus::Delivered, now).unwrap();
        agg.request_return(b.id, "faulty zip", now).unwrap();
        let returned = agg.decide_return(b.id, Decision::Approve, now).unwrap();
        assert_eq!(returned.restock, Some((b.variant_id.unwrap(), 2)));
    }

    #[test]
    fn test_rejected_request_leaves_stock_alone() {
        let mut agg = aggregate(PaymentMethod::Wallet, PaymentStatus::Paid, 1);
        let id = agg.items()[0].id;
        let now = Utc::now();
        agg.advance_item(id, OrderItemStatus::Delivered, now).unwrap();
        agg.request_return(id, "changed my mind", now).unwrap();
        assert_eq!(agg.decide_return(id, Decision::Reject, now).unwrap(), Resolution::default());
        assert_eq!(agg.items()[0].status, OrderItemStatus::Delivered);
    }

    #[test]
    fn test_derived_status() {
        let oid = Uuid::now_v7();
        let items = vec![item(oid, OrderItemStatus::Shipped), item(oid, OrderItemStatus::Processing), item(oid, OrderItemStatus::Cancelled)];
        assert_eq!(derived_status(&items), OrderItemStatus::Processing);
        let items = vec![item(oid, OrderItemStatus::Returned), item(oid, OrderItemStatus::Cancelled)];
        assert_eq!(derived_status(&items), OrderItemStatus::Returned);
    }

    #[test]
    fn test_payment_open() {
        assert!(aggregate(PaymentMethod::Razorpay, PaymentStatus::Failed, 1).ensure_payment_open().is_ok());
        assert_eq!(aggregate(PaymentMethod::Razorpay, PaymentStatus::Paid, 1).ensure_payment_open(), Err(OrderError::PaymentNotOpen));
        assert_eq!(aggregate(PaymentMethod::Cod, PaymentStatus::Pending, 1).ensure_payment_open(), Err(OrderError::NotOnlinePayment));
    }
}

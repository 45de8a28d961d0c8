//! Domain events

use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::order::{OrderItemStatus, PaymentMethod};
use crate::domain::value_objects::Money;

/// Published as JSON on `gearup.<kind>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced { order_id: Uuid, order_code: String, user_id: Uuid, grand_total: Money, payment_method: PaymentMethod },
    OrderPaid { order_id: Uuid, order_code: String, amount: Money, payment_method: PaymentMethod },
    PaymentFailed { order_id: Uuid, order_code: String },
    ItemStatusChanged { order_id: Uuid, item_id: Uuid, from: OrderItemStatus, to: OrderItemStatus },
    ItemCancelled { order_id: Uuid, item_id: Uuid },
    ItemReturned { order_id: Uuid, item_id: Uuid },
    RefundIssued { order_id: Uuid, item_id: Uuid, amount: Money },
    WalletCredited { user_id: Uuid, amount: Money, balance: Money },
}

impl DomainEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "order_placed",
            Self::OrderPaid { .. } => "order_paid",
            Self::PaymentFailed { .. } => "payment_failed",
            Self::ItemStatusChanged { .. } => "item_status_changed",
            Self::ItemCancelled { .. } => "item_cancelled",
            Self::ItemReturned { .. } => "item_returned",
            Self::RefundIssued { .. } => "refund_issued",
            Self::WalletCredited { .. } => "wallet_credited",
        }
    }

    pub fn subject(&self) -> String { format!("gearup.{}", self.kind()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_and_tag_agree() {
        let event = DomainEvent::ItemCancelled { order_id: Uuid::nil(), item_id: Uuid::nil() };
        assert_eq!(event.subject(), "gearup.item_cancelled");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "item_cancelled");
    }
}

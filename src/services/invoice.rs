//! Order invoice, as a PDF download or a printable HTML page.

use askama::Template;

use crate::domain::aggregates::order::ShippingAddress;
use crate::domain::aggregates::{Order, OrderItem};
use crate::error::{AppError, Result};
use crate::services::pdf::{Column, PdfSheet};

struct InvoiceLine {
    product: String,
    quantity: i32,
    unit_price: String,
    tax: String,
    subtotal: String,
    status: &'static str,
}

#[derive(Template)]
#[template(path = "invoice.html")]
struct InvoiceTemplate<'a> {
    order_code: &'a str,
    date: String,
    payment_method: &'static str,
    address: &'a ShippingAddress,
    address_line_2: Option<&'a str>,
    lines: Vec<InvoiceLine>,
    subtotal: String,
    tax: String,
    delivery: String,
    has_discount: bool,
    discount: String,
    grand_total: String,
}

pub fn filename(order: &Order) -> String { format!("invoice_{}.html", order.order_code) }
pub fn pdf_filename(order: &Order) -> String { format!("invoice_{}.pdf", order.order_code) }

const PDF_COLUMNS: [Column; 6] = [
    Column { title: "Product", width: 62.0 },
    Column { title: "Qty", width: 12.0 },
    Column { title: "Unit price", width: 26.0 },
    Column { title: "Tax", width: 24.0 },
    Column { title: "Subtotal", width: 28.0 },
    Column { title: "Status", width: 28.0 },
];

pub fn render_pdf(order: &Order, items: &[OrderItem]) -> Result<Vec<u8>> {
    let address = &order.shipping_address.0;
    let mut sheet = PdfSheet::new(&format!("Invoice {}", order.order_code))?;
    sheet.heading("Order Invoice");
    sheet.line(&format!("Order ID: #{}", order.order_code));
    sheet.line(&format!("Date: {}", order.created_at.format("%d-%m-%Y")));
    sheet.line(&format!("Payment method: {}", order.payment_method.label()));
    sheet.gap(3.0);

    sheet.subheading("Shipping address");
    sheet.line(&address.full_name);
    sheet.line(&address.address_line_1);
    if let Some(line2) = address.address_line_2.as_deref().filter(|l| !l.trim().is_empty()) {
        sheet.line(line2);
    }
    sheet.line(&format!("{}, {} - {}", address.city, address.state, address.postal_code));
    sheet.line(&address.country);
    sheet.line(&format!("Phone: {}", address.phone));
    sheet.gap(4.0);

    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|i| {
            vec![
                format!("{} ({} / {})", i.product_name, i.color, i.size),
                i.quantity.to_string(),
                i.unit_price.to_string(),
                i.tax.to_string(),
                i.line_subtotal().to_string(),
                i.status.label().to_string(),
            ]
        })
        .collect();
    sheet.table(&PDF_COLUMNS, &rows);
    sheet.gap(4.0);

    sheet.pair("Subtotal:", &order.subtotal.to_string(), false);
    sheet.pair("Tax:", &order.tax.to_string(), false);
    sheet.pair("Delivery charge:", &order.delivery_charge.to_string(), false);
    if order.discount.is_positive() {
        sheet.pair("Discount:", &format!("- {}", order.discount), false);
    }
    sheet.pair("Grand total:", &order.grand_total.to_string(), true);
    sheet.gap(6.0);
    sheet.line("Thank you for shopping with GearUp!");
    Ok(sheet.finish()?)
}

pub fn render(order: &Order, items: &[OrderItem]) -> Result<String> {
    let lines = items
        .iter()
        .map(|i| InvoiceLine {
            product: format!("{} ({} / {})", i.product_name, i.color, i.size),
            quantity: i.quantity,
            unit_price: i.unit_price.to_string(),
            tax: i.tax.to_string(),
            subtotal: i.line_subtotal().to_string(),
            status: i.status.label(),
        })
        .collect();
    InvoiceTemplate {
        order_code: &order.order_code,
        date: order.created_at.format("%d %b %Y").to_string(),
        payment_method: order.payment_method.label(),
        address: &order.shipping_address.0,
        address_line_2: order.shipping_address.0.address_line_2.as_deref(),
        lines,
        subtotal: order.subtotal.to_string(),
        tax: order.tax.to_string(),
        delivery: order.delivery_charge.to_string(),
        has_discount: order.discount.is_positive(),
        discount: order.discount.to_string(),
        grand_total: order.grand_total.to_string(),
    }
    .render()
    .map_err(|e| AppError::Internal(format!("Invoice rendering failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{OrderItemStatus, PaymentMethod, PaymentStatus};
    use crate::domain::value_objects::Money;
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn order(discount: i64) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::now_v7(), order_code: "ORD-0000000007".into(), user_id: Uuid::now_v7(),
            shipping_address: Json(ShippingAddress { full_name: "Asha Rao".into(), city: "Pune".into(), ..Default::default() }),
            payment_method: PaymentMethod::Cod, payment_status: PaymentStatus::Pending,
            subtotal: Money::from_major(1000), tax: Money::from_major(180), delivery_charge: Money::from_major(50),
            discount: Money::from_major(discount), grand_total: Money::from_major(1230 - discount), coupon_id: None,
            razorpay_order_id: None, razorpay_payment_id: None, razorpay_signature: None, delivery_refunded: false, cod_settled: false,
            created_at: now, updated_at: now,
        }
    }

    fn item(order_id: Uuid) -> OrderItem {
        OrderItem {
            id: Uuid::now_v7(), order_id, variant_id: None, product_id: None, product_name: "Hiking Boot".into(),
            color: "Brown".into(), size: "9".into(), quantity: 2, unit_price: Money::from_major(500),
            tax: Money::from_major(180), discount: Money::zero(), status: OrderItemStatus::Shipped,
            cancellation_requested: false, cancellation_reason: None, cancellation_approved: None,
            return_requested: false, return_reason: None, return_approved: None, refund_amount: Money::zero(),
            delivered_at: None, updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_invoice_lists_lines_and_totals() {
        let o = order(0);
        let html = render(&o, &[item(o.id)]).unwrap();
        assert!(html.contains("ORD-0000000007"));
        assert!(html.contains("Hiking Boot"));
        assert!(html.contains("Shipped"));
        assert!(html.contains("Rs. 1230.00"));
        assert!(!html.contains("Discount"));
        assert_eq!(filename(&o), "invoice_ORD-0000000007.html");
    }

    #[test]
    fn test_pdf_invoice() {
        let o = order(100);
        let items: Vec<OrderItem> = (0..3).map(|_| item(o.id)).collect();
        let pdf = render_pdf(&o, &items).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        assert_eq!(pdf_filename(&o), "invoice_ORD-0000000007.pdf");
    }

    #[test]
    fn test_discount_row_only_when_positive() {
        let o = order(100);
        assert!(render(&o, &[]).unwrap().contains("Discount"));
    }
}

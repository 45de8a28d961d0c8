//! Sales report as a PDF download.

use chrono::Duration;

use crate::db::reports::{ReportWindow, SalesRow, SalesSummary};
use crate::error::Result;
use crate::services::pdf::{Column, PdfSheet};

const COLUMNS: [Column; 7] = [
    Column { title: "Order", width: 30.0 },
    Column { title: "Date", width: 24.0 },
    Column { title: "Customer", width: 44.0 },
    Column { title: "Payment", width: 26.0 },
    Column { title: "Status", width: 22.0 },
    Column { title: "Discount", width: 17.0 },
    Column { title: "Total", width: 17.0 },
];

/// `sales_20250301_20250331.pdf`; the window end is exclusive, the name is not.
pub fn filename(window: &ReportWindow, ext: &str) -> String {
    let last_day = window.end - Duration::days(1);
    format!("sales_{}_{}.{ext}", window.start.format("%Y%m%d"), last_day.format("%Y%m%d"))
}

pub fn render_pdf(window: &ReportWindow, summary: &SalesSummary, rows: &[SalesRow]) -> Result<Vec<u8>> {
    let last_day = window.end - Duration::days(1);
    let mut sheet = PdfSheet::new("GearUp sales report")?;
    sheet.heading("Sales Report");
    sheet.line(&format!("Period: {} to {}", window.start.format("%d %b %Y"), last_day.format("%d %b %Y")));
    sheet.gap(3.0);

    sheet.pair("Orders:", &summary.order_count.to_string(), false);
    sheet.pair("Gross sales:", &summary.gross_sales.to_string(), false);
    sheet.pair("Discounts:", &summary.total_discount.to_string(), false);
    sheet.pair("Refunds:", &summary.total_refunds.to_string(), false);
    sheet.gap(5.0);

    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.order_code.clone(),
                r.created_at.format("%d-%m-%Y").to_string(),
                r.customer_email.clone(),
                r.payment_method.label().to_string(),
                format!("{:?}", r.payment_status),
                r.discount.amount().to_string(),
                r.grand_total.amount().to_string(),
            ]
        })
        .collect();
    if rows.is_empty() {
        sheet.line("No orders in this period.");
    } else {
        sheet.table(&COLUMNS, &rows);
    }
    Ok(sheet.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::reports::{RangeKind, RangeQuery};
    use crate::domain::aggregates::{PaymentMethod, PaymentStatus};
    use crate::domain::value_objects::Money;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn march() -> ReportWindow {
        let d = |day| NaiveDate::from_ymd_opt(2025, 3, day);
        RangeQuery { range: RangeKind::Custom, from: d(1), to: d(31) }.window(Utc::now()).unwrap()
    }

    #[test]
    fn test_filename_uses_inclusive_dates() {
        assert_eq!(filename(&march(), "pdf"), "sales_20250301_20250331.pdf");
    }

    #[test]
    fn test_report_renders_with_and_without_orders() {
        let summary = SalesSummary {
            order_count: 1,
            gross_sales: Money::from_major(1230),
            total_discount: Money::zero(),
            total_refunds: Money::zero(),
        };
        let row = SalesRow {
            order_code: "ORD-0000000011".into(),
            created_at: Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap(),
            customer_email: "asha@example.com".into(),
            payment_method: PaymentMethod::Wallet,
            payment_status: PaymentStatus::Paid,
            subtotal: Money::from_major(1000),
            tax: Money::from_major(180),
            delivery_charge: Money::from_major(50),
            discount: Money::zero(),
            grand_total: Money::from_major(1230),
        };
        assert!(render_pdf(&march(), &summary, &[row]).unwrap().starts_with(b"%PDF-"));
        assert!(render_pdf(&march(), &summary, &[]).unwrap().starts_with(b"%PDF-"));
    }
}

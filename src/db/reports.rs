//! Sales aggregates for the admin dashboard and the sales report.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

use crate::domain::aggregates::{PaymentMethod, PaymentStatus};
use crate::domain::value_objects::Money;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeKind {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Custom,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RangeQuery {
    #[serde(default)]
    pub range: RangeKind,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Half-open `[start, end)` window and the series bucket size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub bucket: &'static str,
}

fn start_of(day: NaiveDate) -> DateTime<Utc> { Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)) }

impl RangeQuery {
    /// `None` when a custom range is missing a bound or is inverted.
    pub fn window(&self, now: DateTime<Utc>) -> Option<ReportWindow> {
        let today = now.date_naive();
        let tomorrow = start_of(today) + Duration::days(1);
        let (start, end, bucket) = match self.range {
            RangeKind::Daily => (start_of(today), tomorrow, "day"),
            RangeKind::Weekly => (start_of(today) - Duration::days(6), tomorrow, "day"),
            RangeKind::Monthly => (start_of(today) - Duration::days(29), tomorrow, "day"),
            RangeKind::Yearly => (start_of(today) - Duration::days(364), tomorrow, "month"),
            RangeKind::Custom => {
                let (from, to) = (self.from?, self.to?);
                if to < from {
                    return None;
                }
                (start_of(from), start_of(to) + Duration::days(1), "day")
            }
        };
        Some(ReportWindow { start, end, bucket })
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SalesSummary {
    pub order_count: i64,
    pub gross_sales: Money,
    pub total_discount: Money,
    #[sqlx(skip)]
    pub total_refunds: Money,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SeriesPoint {
    pub bucket: DateTime<Utc>,
    pub orders: i64,
    pub sales: Money,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Ranked {
    pub name: String,
    pub units: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub window: ReportWindow,
    pub summary: SalesSummary,
    pub series: Vec<SeriesPoint>,
    pub top_products: Vec<Ranked>,
    pub top_categories: Vec<Ranked>,
    pub top_brands: Vec<Ranked>,
}

const IN_RANGE: &str = "o.created_at >= $1 AND o.created_at < $2 AND o.payment_status <> 'failed'";

/// Order count, gross sales, discounts and refunds in the window.
pub async fn summary(conn: &mut PgConnection, window: ReportWindow) -> sqlx::Result<SalesSummary> {
    let mut summary = sqlx::query_as::<_, SalesSummary>(&format!(
        "SELECT COUNT(*) AS order_count, COALESCE(SUM(o.grand_total), 0) AS gross_sales, \
         COALESCE(SUM(o.discount), 0) AS total_discount FROM orders o WHERE {IN_RANGE}"
    ))
    .bind(window.start)
    .bind(window.end)
    .fetch_one(&mut *conn)
    .await?;

    summary.total_refunds = sqlx::query_scalar(&format!(
        "SELECT COALESCE(SUM(i.refund_amount), 0) FROM order_items i JOIN orders o ON o.id = i.order_id WHERE {IN_RANGE}"
    ))
    .bind(window.start)
    .bind(window.end)
    .fetch_one(&mut *conn)
    .await?;
    Ok(summary)
}

pub async fn dashboard(conn: &mut PgConnection, window: ReportWindow) -> sqlx::Result<Dashboard> {
    let summary = summary(&mut *conn, window).await?;
    let series = sqlx::query_as::<_, SeriesPoint>(&format!(
        "SELECT date_trunc($3, o.created_at) AS bucket, COUNT(*) AS orders, COALESCE(SUM(o.grand_total), 0) AS sales \
         FROM orders o WHERE {IN_RANGE} GROUP BY 1 ORDER BY 1"
    ))
    .bind(window.start)
    .bind(window.end)
    .bind(window.bucket)
    .fetch_all(&mut *conn)
    .await?;

    let top_products = top(conn, window, "i.product_name", "").await?;
    let top_categories = top(conn, window, "c.name", "JOIN products p ON p.id = i.product_id JOIN categories c ON c.id = p.category_id").await?;
    let top_brands = top(conn, window, "p.brand", "JOIN products p ON p.id = i.product_id").await?;

    Ok(Dashboard { window, summary, series, top_products, top_categories, top_brands })
}

/// Ten best sellers by units, grouped on `group_expr`. Cancelled and returned units do not count.
async fn top(conn: &mut PgConnection, window: ReportWindow, group_expr: &str, joins: &str) -> sqlx::Result<Vec<Ranked>> {
    sqlx::query_as::<_, Ranked>(&format!(
        "SELECT {group_expr} AS name, SUM(i.quantity)::BIGINT AS units FROM order_items i JOIN orders o ON o.id = i.order_id {joins} \
         WHERE {IN_RANGE} AND i.status NOT IN ('cancelled', 'returned') GROUP BY {group_expr} ORDER BY units DESC, name LIMIT 10"
    ))
    .bind(window.start)
    .bind(window.end)
    .fetch_all(&mut *conn)
    .await
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SalesRow {
    pub order_code: String,
    pub created_at: DateTime<Utc>,
    pub customer_email: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub subtotal: Money,
    pub tax: Money,
    pub delivery_charge: Money,
    pub discount: Money,
    pub grand_total: Money,
}

pub async fn sales_rows(conn: &mut PgConnection, window: ReportWindow) -> sqlx::Result<Vec<SalesRow>> {
    sqlx::query_as::<_, SalesRow>(&format!(
        "SELECT o.order_code, o.created_at, u.email AS customer_email, o.payment_method, o.payment_status, o.subtotal, o.tax, \
         o.delivery_charge, o.discount, o.grand_total FROM orders o JOIN users u ON u.id = o.user_id WHERE {IN_RANGE} \
         ORDER BY o.created_at"
    ))
    .bind(window.start)
    .bind(window.end)
    .fetch_all(conn)
    .await
}

/// Quotes a free-text field. A leading formula character is neutralised
/// with `'` so spreadsheets show the text instead of evaluating it.
fn csv_field(value: &str) -> String {
    let value = if value.starts_with(['=', '+', '-', '@', '\t', '\r']) { format!("'{value}") } else { value.to_string() };
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value
    }
}

pub fn sales_csv(rows: &[SalesRow]) -> String {
    let mut out = String::from("order_code,date,customer,payment_method,payment_status,subtotal,tax,delivery,discount,grand_total\n");
    for r in rows {
        let fields = [
            csv_field(&r.order_code),
            r.created_at.format("%Y-%m-%d %H:%M").to_string(),
            csv_field(&r.customer_email),
            r.payment_method.label().to_string(),
            format!("{:?}", r.payment_status).to_lowercase(),
            r.subtotal.amount().to_string(),
            r.tax.amount().to_string(),
            r.delivery_charge.amount().to_string(),
            r.discount.amount().to_string(),
            r.grand_total.amount().to_string(),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(y, m, d, 15, 30, 0).unwrap() }

    #[test]
    fn test_windows() {
        let now = at(2025, 3, 10);
        let daily = RangeQuery::default().window(now).unwrap();
        assert_eq!(daily.start, Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(daily.end, Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap());
        let yearly = RangeQuery { range: RangeKind::Yearly, ..Default::default() }.window(now).unwrap();
        assert_eq!(yearly.bucket, "month");
    }

    #[test]
    fn test_custom_window_needs_ordered_bounds() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 1, day);
        let now = at(2025, 3, 10);
        assert!(RangeQuery { range: RangeKind::Custom, from: d(5), to: None }.window(now).is_none());
        assert!(RangeQuery { range: RangeKind::Custom, from: d(5), to: d(4) }.window(now).is_none());
        let w = RangeQuery { range: RangeKind::Custom, from: d(5), to: d(5) }.window(now).unwrap();
        assert_eq!(w.end - w.start, Duration::days(1));
    }

    #[test]
    fn test_csv_escapes() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_csv_neutralises_formulas() {
        assert_eq!(csv_field("=HYPERLINK(\"x\")"), "\"'=HYPERLINK(\"\"x\"\")\"");
        assert_eq!(csv_field("+91@example.com"), "'+91@example.com");
        assert_eq!(csv_field("@sum"), "'@sum");
        assert_eq!(csv_field("-2"), "'-2");
        assert_eq!(csv_field("asha@example.com"), "asha@example.com");
    }
}

//! # Sale Types
//!
//! The sale header and line item records, the request the UI submits, and
//! the denormalized views the store hands back.
//!
//! ## Sale Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  UI builds SaleRequest ──► create_sale ──► sales + sale_items + stock  │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │                            CompleteSale                                 │
//! │               (header + customer + items with product refs)            │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │                       Receipt / dashboard rendering                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::{Money, Percent};
use crate::types::Customer;

// =============================================================================
// Status Codes
// =============================================================================

/// Sale status, stored as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SaleStatus {
    #[default]
    Completed = 1,
    Pending = 2,
    Cancelled = 3,
}

impl From<SaleStatus> for u8 {
    fn from(status: SaleStatus) -> u8 {
        status as u8
    }
}

impl TryFrom<u8> for SaleStatus {
    type Error = UnknownCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(SaleStatus::Completed),
            2 => Ok(SaleStatus::Pending),
            3 => Ok(SaleStatus::Cancelled),
            other => Err(UnknownCode {
                field: "status",
                code: other,
            }),
        }
    }
}

/// Payment status, stored as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PaymentStatus {
    #[default]
    Paid = 1,
    Partial = 2,
    Unpaid = 3,
}

impl From<PaymentStatus> for u8 {
    fn from(status: PaymentStatus) -> u8 {
        status as u8
    }
}

impl TryFrom<u8> for PaymentStatus {
    type Error = UnknownCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(PaymentStatus::Paid),
            2 => Ok(PaymentStatus::Partial),
            3 => Ok(PaymentStatus::Unpaid),
            other => Err(UnknownCode {
                field: "payment_status",
                code: other,
            }),
        }
    }
}

/// An integer status code outside the known set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownCode {
    pub field: &'static str,
    pub code: u8,
}

impl fmt::Display for UnknownCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} code {}", self.field, self.code)
    }
}

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    #[default]
    Cash,
    Card,
    Transfer,
    Cheque,
}

// =============================================================================
// Stored Records
// =============================================================================

/// Sale header as stored in the `sales` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: i64,
    pub customer_id: Option<i64>,
    #[ts(as = "f64")]
    pub subtotal: Money,
    /// Discount in percent of the subtotal.
    #[ts(as = "f64")]
    pub discount: Percent,
    /// Tax rate in percent of the discounted subtotal.
    #[ts(as = "f64")]
    pub tax_rate: Percent,
    #[ts(as = "f64")]
    pub tax_amount: Money,
    #[ts(as = "f64")]
    pub shipping: Money,
    #[ts(as = "f64")]
    pub grand_total: Money,
    #[ts(as = "f64")]
    pub received_amount: Money,
    #[ts(as = "f64")]
    pub change_amount: Money,
    pub payment_type: PaymentType,
    #[ts(as = "u8")]
    pub payment_status: PaymentStatus,
    #[ts(as = "u8")]
    pub status: SaleStatus,
    #[serde(default)]
    pub note: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Line item as stored in the `sale_items` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    /// Unit price at time of sale.
    #[ts(as = "f64")]
    pub price: Money,
    /// `quantity * price`.
    #[ts(as = "f64")]
    pub total: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale Request
// =============================================================================

/// One requested line of a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLineRequest {
    pub product_id: i64,
    pub quantity: i64,
    #[ts(as = "f64")]
    pub price: Money,
    #[ts(as = "f64")]
    pub total: Money,
}

impl SaleLineRequest {
    /// Builds a line whose `total` is `quantity * price`.
    pub fn new(product_id: i64, quantity: i64, price: Money) -> Self {
        SaleLineRequest {
            product_id,
            quantity,
            price,
            total: price.multiply_quantity(quantity),
        }
    }
}

/// A sale as submitted by the checkout flow.
///
/// Totals are computed by the caller (see [`crate::totals::SaleTotals`]);
/// the store verifies them according to its totals policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRequest {
    pub customer_id: Option<i64>,
    pub sale_items: Vec<SaleLineRequest>,
    #[ts(as = "f64")]
    pub subtotal: Money,
    #[serde(default)]
    #[ts(as = "f64")]
    pub discount: Percent,
    #[serde(default)]
    #[ts(as = "f64")]
    pub tax_rate: Percent,
    #[serde(default)]
    #[ts(as = "f64")]
    pub tax_amount: Money,
    #[serde(default)]
    #[ts(as = "f64")]
    pub shipping: Money,
    #[ts(as = "f64")]
    pub grand_total: Money,
    /// Amount tendered. Defaults to `grand_total` when absent.
    #[ts(as = "Option<f64>")]
    pub received_amount: Option<Money>,
    #[serde(default)]
    pub payment_type: PaymentType,
    #[serde(default)]
    #[ts(as = "u8")]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    #[ts(as = "u8")]
    pub status: SaleStatus,
    #[serde(default)]
    pub note: String,
}

impl SaleRequest {
    /// Total quantity across all lines.
    pub fn unit_count(&self) -> i64 {
        self.sale_items.iter().map(|line| line.quantity).sum()
    }
}

// =============================================================================
// Denormalized Views
// =============================================================================

/// The product fields a receipt needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductRef {
    pub id: i64,
    pub name: String,
    pub code: String,
}

/// A stored line item with its product resolved (`None` if the product
/// record is gone).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItemView {
    #[serde(flatten)]
    pub item: SaleItem,
    pub product: Option<ProductRef>,
}

/// Sale header + resolved customer + line items with product refs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CompleteSale {
    #[serde(flatten)]
    pub sale: Sale,
    pub customer: Option<Customer>,
    pub sale_items: Vec<SaleItemView>,
}

impl CompleteSale {
    #[inline]
    pub fn id(&self) -> i64 {
        self.sale.id
    }
}

/// Lighter list entry: header + customer + item count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleSummary {
    #[serde(flatten)]
    pub sale: Sale,
    pub customer: Option<Customer>,
    pub items_count: usize,
}

/// Dashboard figures. Serialized with the camelCase names the dashboard
/// screen reads.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Sum of `grand_total` of today's completed sales.
    #[ts(as = "f64")]
    pub today_sales: Money,
    /// Sum of `grand_total` of all completed sales.
    #[ts(as = "f64")]
    pub total_revenue: Money,
    /// Number of completed sales.
    pub total_sales: usize,
    /// Active products with `stock_quantity <= min_stock`.
    pub low_stock_products: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip_as_integers() {
        assert_eq!(serde_json::to_string(&SaleStatus::Cancelled).unwrap(), "3");
        let status: SaleStatus = serde_json::from_str("2").unwrap();
        assert_eq!(status, SaleStatus::Pending);
        assert!(serde_json::from_str::<SaleStatus>("9").is_err());

        let paid: PaymentStatus = serde_json::from_str("1").unwrap();
        assert_eq!(paid, PaymentStatus::Paid);
    }

    #[test]
    fn test_request_defaults() {
        let request: SaleRequest = serde_json::from_value(serde_json::json!({
            "customer_id": null,
            "sale_items": [{ "product_id": 1, "quantity": 2, "price": 1.25, "total": 2.5 }],
            "subtotal": 2.5,
            "grand_total": 2.5
        }))
        .unwrap();
        assert_eq!(request.status, SaleStatus::Completed);
        assert_eq!(request.payment_type, PaymentType::Cash);
        assert_eq!(request.received_amount, None);
        assert_eq!(request.unit_count(), 2);
    }

    #[test]
    fn test_line_request_total() {
        let line = SaleLineRequest::new(4, 3, Money::from_cents(299));
        assert_eq!(line.total.cents(), 897);
    }

    #[test]
    fn test_dashboard_stats_camel_case() {
        let stats = DashboardStats {
            today_sales: Money::from_cents(6000),
            ..Default::default()
        };
        let value = serde_json::to_value(stats).unwrap();
        assert_eq!(value["todaySales"], 60.0);
        assert_eq!(value["lowStockProducts"], 0);
    }
}
